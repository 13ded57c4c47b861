use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Standard tag names harvested from every game's PGN header.
pub const HARVESTED_TAGS: &[&str] = &[
    "Event",
    "Site",
    "Date",
    "Round",
    "White",
    "Black",
    "Result",
    "UTCDate",
    "UTCTime",
    "StartTime",
    "EndTime",
    "TimeControl",
    "Termination",
    "ECO",
    "Opening",
    "Variation",
    "CurrentPosition",
    "SetUp",
    "FEN",
    "Link",
    "Annotator",
    "Title",
    "EventDate",
];

static TAG_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).expect("tag pair regex"));

static MOVE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+)\.\s").expect("move number regex"));

/// Value of the first tag-pair `[name "value"]` in the PGN text. Tag names
/// are matched exactly (case-sensitive, as they appear in standard PGN).
pub fn pgn_tag(pgn: &str, name: &str) -> Option<String> {
    if pgn.is_empty() {
        return None;
    }
    TAG_PAIR_RE
        .captures_iter(pgn)
        .find(|caps| &caps[1] == name)
        .map(|caps| caps[2].to_string())
}

/// Look up every standard tag independently; absent tags map to `None`.
/// Empty PGN input yields an empty map.
pub fn harvest_tags(pgn: &str) -> BTreeMap<String, Option<String>> {
    let mut out = BTreeMap::new();
    if pgn.is_empty() {
        return out;
    }
    for tag in HARVESTED_TAGS {
        out.insert((*tag).to_string(), pgn_tag(pgn, tag));
    }
    out
}

/// Numeric value of the last move-number marker ("12. ") in the PGN text.
/// Counts move-number labels, not plies; SAN is never parsed.
pub fn estimate_move_count(pgn: &str) -> Option<u32> {
    if pgn.is_empty() {
        return None;
    }
    MOVE_NUMBER_RE
        .captures_iter(pgn)
        .last()
        .and_then(|caps| caps[1].parse::<u32>().ok())
}

#[cfg(test)]
mod tests {
    use super::{HARVESTED_TAGS, estimate_move_count, harvest_tags, pgn_tag};

    const PGN: &str = concat!(
        "[Event \"Live Chess\"]\n",
        "[Site \"Chess.com\"]\n",
        "[White \"Alice\"]\n",
        "[Black \"Bob\"]\n",
        "[Result \"1-0\"]\n",
        "[ECO \"B20\"]\n",
        "[Opening \"Sicilian Defense\"]\n",
        "[Termination \"Alice won by checkmate\"]\n",
        "\n",
        "1. e4 c5 2. Nf3 d6 3. d4 cxd4 1-0\n",
    );

    #[test]
    fn extracts_named_tags() {
        assert_eq!(pgn_tag(PGN, "ECO").as_deref(), Some("B20"));
        assert_eq!(pgn_tag(PGN, "White").as_deref(), Some("Alice"));
        assert_eq!(pgn_tag(PGN, "Round"), None);
    }

    #[test]
    fn tag_names_match_exactly() {
        let pgn = "[EventDate \"2024.01.05\"]\n1. e4 e5\n";
        assert_eq!(pgn_tag(pgn, "Event"), None);
        assert_eq!(pgn_tag(pgn, "EventDate").as_deref(), Some("2024.01.05"));
    }

    #[test]
    fn empty_tag_value_is_kept() {
        let pgn = "[Variation \"\"]\n";
        assert_eq!(pgn_tag(pgn, "Variation").as_deref(), Some(""));
    }

    #[test]
    fn harvest_covers_the_full_tag_set() {
        let tags = harvest_tags(PGN);
        assert_eq!(tags.len(), HARVESTED_TAGS.len());
        assert_eq!(
            tags.get("ECO").and_then(|v| v.as_deref()),
            Some("B20")
        );
        assert_eq!(tags.get("Annotator"), Some(&None));
    }

    #[test]
    fn harvest_of_empty_pgn_is_empty() {
        assert!(harvest_tags("").is_empty());
    }

    #[test]
    fn move_count_takes_the_last_marker() {
        assert_eq!(estimate_move_count(PGN), Some(3));
        assert_eq!(estimate_move_count("1. e4 e5 2. Nf3 Nc6 12. O-O "), Some(12));
    }

    #[test]
    fn move_count_absent_without_markers() {
        assert_eq!(estimate_move_count(""), None);
        assert_eq!(estimate_move_count("[Event \"x\"]"), None);
    }
}
