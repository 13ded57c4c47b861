/// Decoded compact time-control string, e.g. `"180+2"` or `"1/86400"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimeControl {
    pub base_seconds: Option<i64>,
    pub increment_seconds: Option<i64>,
    /// Canonical rendering, or the original string when it did not parse.
    pub mode: Option<String>,
}

/// Decode a Chess.com time-control string.
///
/// `"M/S"` is the daily format (moves per day / seconds), `"B+I"` is base
/// plus increment, and a bare integer means no increment. A string that
/// fails to parse is preserved in `mode` with both numbers absent; one
/// malformed value must not abort a batch covering years of games.
pub fn parse_time_control(raw: Option<&str>) -> TimeControl {
    let Some(raw) = raw else {
        return TimeControl::default();
    };
    if raw.is_empty() {
        return TimeControl::default();
    }

    if let Some((moves, per)) = raw.split_once('/') {
        return match (parse_int(moves), parse_int(per)) {
            (Some(moves), Some(per)) => TimeControl {
                base_seconds: Some(moves),
                increment_seconds: Some(per),
                mode: Some(raw.to_string()),
            },
            _ => unparsed(raw),
        };
    }

    if let Some((base, inc)) = raw.split_once('+') {
        return match (parse_int(base), parse_int(inc)) {
            (Some(base), Some(inc)) => TimeControl {
                base_seconds: Some(base),
                increment_seconds: Some(inc),
                mode: Some(format!("{base}+{inc}")),
            },
            _ => unparsed(raw),
        };
    }

    match parse_int(raw) {
        Some(base) => TimeControl {
            base_seconds: Some(base),
            increment_seconds: Some(0),
            mode: Some(format!("{base}+0")),
        },
        None => unparsed(raw),
    }
}

fn unparsed(raw: &str) -> TimeControl {
    TimeControl {
        base_seconds: None,
        increment_seconds: None,
        mode: Some(raw.to_string()),
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}
