use std::collections::BTreeMap;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pgn_tags::{estimate_move_count, harvest_tags, pgn_tag};
use crate::time_control::parse_time_control;

pub const RECORD_SCHEMA_VERSION: u32 = 1;

const LOSS_CODES: &[&str] = &["checkmated", "resigned", "timeout", "lose", "abandoned"];
const DRAW_CODES: &[&str] = &[
    "agreed",
    "stalemate",
    "repetition",
    "timevsinsufficient",
    "insufficient",
    "50move",
    "draw",
];

/// One flattened game, always from the perspective of the requested user.
///
/// Every field is declared here rather than assembled ad hoc; the profile
/// enrichment block at the end is only serialized when populated, so an
/// unenriched record simply lacks those keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    // Identity
    pub username: String,
    pub user_color: String,
    pub opponent_username: Option<String>,
    // Game meta
    pub url: Option<String>,
    pub uuid: Option<String>,
    pub rated: Option<bool>,
    pub rules: Option<String>,
    pub time_class: Option<String>,
    pub time_control: Option<String>,
    pub time_control_mode: Option<String>,
    pub time_control_seconds: Option<i64>,
    pub increment_seconds: Option<i64>,
    pub is_daily: bool,
    pub is_chess960: bool,
    pub has_initial_fen: bool,
    pub has_clock_increment: bool,
    // Ratings
    pub user_rating: Option<i64>,
    pub opponent_rating: Option<i64>,
    pub rating_delta: Option<i64>,
    // Results
    pub user_result: Option<String>,
    pub winner: Option<String>,
    pub is_win: bool,
    pub is_loss: bool,
    pub is_draw: bool,
    pub result_reason: Option<String>,
    pub is_timeout: bool,
    pub is_abandoned: bool,
    pub is_agreed_draw: bool,
    pub is_threefold: bool,
    pub is_50move: bool,
    pub is_insufficient_material: bool,
    pub points_user: f64,
    pub points_opponent: f64,
    // Opening
    pub eco: Option<String>,
    pub eco_family: Option<String>,
    pub opening_name: Option<String>,
    pub opening_variation: Option<String>,
    // Timing
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub end_ts_utc: Option<String>,
    pub start_ts_utc: Option<String>,
    pub duration_seconds: Option<i64>,
    // PGN derivations
    pub pgn_move_count: Option<u32>,
    pub end_by_checkmate: bool,
    pub end_by_resignation: bool,
    pub end_by_stalemate: bool,
    pub pgn_tags: BTreeMap<String, Option<String>>,
    // Board state
    pub fen_final: Option<String>,
    pub initial_setup: Option<String>,
    pub tcn: Option<String>,
    // Accuracies
    pub accuracy_white: Option<f64>,
    pub accuracy_black: Option<f64>,
    // Raw payload, verbatim, for traceability
    pub raw: Value,
    // Profile enrichment
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_name_full: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_joined: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_last_online: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_fide: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub opponent_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub opponent_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub opponent_name_full: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub opponent_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub opponent_country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub opponent_joined: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub opponent_last_online: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub opponent_fide: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub opponent_verified: Option<bool>,
}

/// Flatten one raw game payload from the perspective of `username`.
///
/// Pure and infallible: malformed sub-fields degrade to `None`/`false`
/// fields, never an error. One bad record must not halt a batch job.
pub fn normalize_game(username: &str, game: &Value) -> GameRecord {
    let username_lower = username.to_lowercase();
    let null = Value::Null;
    let white = game.get("white").unwrap_or(&null);
    let black = game.get("black").unwrap_or(&null);

    let matches_user = |side: &Value| {
        str_field(side, "username").is_some_and(|u| u.to_lowercase() == username_lower)
    };
    let is_white_me = matches_user(white);
    let is_black_me = matches_user(black);
    let (me, opp, user_color) = if is_white_me {
        (white, black, "white")
    } else if is_black_me {
        (black, white, "black")
    } else {
        // Neither side matched; keep the row rather than dropping it, but
        // make the anomaly visible.
        log::warn!(
            "neither side of game {} matches user {username}, defaulting to white",
            str_field(game, "url").unwrap_or_else(|| "<no url>".to_string())
        );
        (white, black, "white")
    };

    let start_time = epoch_field(game, "start_time");
    let end_time = epoch_field(game, "end_time");
    let start_ts_utc = rfc3339_utc(start_time);
    let end_ts_utc = rfc3339_utc(end_time);
    let duration_seconds = match (start_time, end_time) {
        (Some(start), Some(end)) => Some((end - start).max(0)),
        _ => None,
    };

    let time_control_raw = str_field(game, "time_control");
    let tc = parse_time_control(time_control_raw.as_deref());

    let rules = str_field(game, "rules");
    let pgn = str_field(game, "pgn").unwrap_or_default();
    let eco = pgn_tag(&pgn, "ECO");
    let eco_family = eco
        .as_deref()
        .and_then(|e| e.chars().next())
        .map(|c| c.to_string());
    let opening_name = pgn_tag(&pgn, "Opening");
    let opening_variation = pgn_tag(&pgn, "Variation");
    let termination = non_empty(pgn_tag(&pgn, "Termination"))
        .or_else(|| non_empty(str_field(game, "termination")));
    let result_tag = pgn_tag(&pgn, "Result");
    let pgn_move_count = estimate_move_count(&pgn);
    let pgn_tags = harvest_tags(&pgn);

    // The structured per-player code wins; the PGN Result tag is the
    // fallback for older payloads that lack it.
    let my_result = non_empty(str_field(me, "result")).or_else(|| non_empty(result_tag.clone()));
    let my_result_str = my_result.clone().unwrap_or_default();
    let is_win = my_result.as_deref() == Some("win");
    let is_loss = my_result
        .as_deref()
        .is_some_and(|code| LOSS_CODES.contains(&code));
    let is_draw = my_result
        .as_deref()
        .is_some_and(|code| DRAW_CODES.contains(&code));

    let white_result = str_field(white, "result");
    let black_result = str_field(black, "result");
    let winner = if white_result.as_deref() == Some("win") {
        Some("white".to_string())
    } else if black_result.as_deref() == Some("win") {
        Some("black".to_string())
    } else {
        None
    };

    let result_reason = my_result.clone().or_else(|| termination.clone());

    let opponent_username = str_field(opp, "username");
    let user_rating = flex_i64_field(me, "rating");
    let opponent_rating = flex_i64_field(opp, "rating");
    // Only a structured rating_change counts; post-game ratings are not
    // reliably available, so no delta is ever computed from them.
    let rating_delta = me
        .get("rating_change")
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)));

    // Either the result code or the free-text termination may be the only
    // populated signal, depending on API version; check both.
    let term_lower = termination.as_deref().map(str::to_lowercase).unwrap_or_default();
    let opp_result = str_field(opp, "result");
    let end_by_checkmate = (is_win && opp_result.as_deref() == Some("checkmated"))
        || term_lower.contains("checkmate");
    let end_by_resignation =
        (is_win && opp_result.as_deref() == Some("resigned")) || term_lower.contains("resign");
    let end_by_stalemate =
        my_result_str.contains("stalemate") || term_lower.contains("stalemate");
    let is_timeout = my_result_str.contains("timeout") || term_lower.contains("timeout");
    let is_abandoned = my_result_str.contains("abandoned") || term_lower.contains("abandon");
    let is_agreed_draw = my_result.as_deref() == Some("agreed");
    let is_threefold = my_result.as_deref() == Some("repetition");
    let is_50move = my_result.as_deref() == Some("50move");
    let is_insufficient_material = matches!(
        my_result.as_deref(),
        Some("insufficient") | Some("timevsinsufficient")
    );

    let points_user = if is_win {
        1.0
    } else if is_draw {
        0.5
    } else {
        0.0
    };
    // A draw scores exactly 0.5 for both sides.
    let points_opponent = if points_user == 0.5 {
        0.5
    } else {
        1.0 - points_user
    };

    let setup_tag = pgn_tags.get("SetUp").and_then(|v| v.clone());
    let fen_tag = pgn_tags.get("FEN").and_then(|v| v.clone());
    let initial_setup = str_field(game, "initial_setup");
    let is_daily = time_control_raw.as_deref().is_some_and(|tc| tc.contains('/'));
    let is_chess960 = rules.as_deref() == Some("chess960")
        || (setup_tag.as_deref() == Some("1")
            && fen_tag.as_deref().is_some_and(|fen| !fen.is_empty()));
    let has_initial_fen = initial_setup.as_deref().is_some_and(|s| !s.is_empty())
        || fen_tag.as_deref().is_some_and(|fen| !fen.is_empty());
    let has_clock_increment = tc.increment_seconds.is_some_and(|inc| inc > 0);

    let accuracies = game.get("accuracies").unwrap_or(&null);
    let accuracy_white = f64_field(accuracies, "white");
    let accuracy_black = f64_field(accuracies, "black");

    GameRecord {
        username: username.to_string(),
        user_color: user_color.to_string(),
        opponent_username,
        url: str_field(game, "url"),
        uuid: str_field(game, "uuid"),
        rated: bool_field(game, "rated"),
        rules,
        time_class: str_field(game, "time_class"),
        time_control: time_control_raw,
        time_control_mode: tc.mode,
        time_control_seconds: tc.base_seconds,
        increment_seconds: tc.increment_seconds,
        is_daily,
        is_chess960,
        has_initial_fen,
        has_clock_increment,
        user_rating,
        opponent_rating,
        rating_delta,
        user_result: my_result,
        winner,
        is_win,
        is_loss,
        is_draw,
        result_reason,
        is_timeout,
        is_abandoned,
        is_agreed_draw,
        is_threefold,
        is_50move,
        is_insufficient_material,
        points_user,
        points_opponent,
        eco,
        eco_family,
        opening_name,
        opening_variation,
        start_time,
        end_time,
        end_ts_utc,
        start_ts_utc,
        duration_seconds,
        pgn_move_count,
        end_by_checkmate,
        end_by_resignation,
        end_by_stalemate,
        pgn_tags,
        fen_final: str_field(game, "fen"),
        initial_setup,
        tcn: str_field(game, "tcn"),
        accuracy_white,
        accuracy_black,
        raw: game.clone(),
        user_title: None,
        user_status: None,
        user_name_full: None,
        user_location: None,
        user_country_code: None,
        user_joined: None,
        user_last_online: None,
        user_fide: None,
        user_verified: None,
        opponent_title: None,
        opponent_status: None,
        opponent_name_full: None,
        opponent_location: None,
        opponent_country_code: None,
        opponent_joined: None,
        opponent_last_online: None,
        opponent_fide: None,
        opponent_verified: None,
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn bool_field(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(Value::as_bool)
}

fn f64_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

/// Rating fields occasionally arrive as strings; accept a number or a
/// numeric string, anything else is absent.
fn flex_i64_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Epoch seconds as an integer, truncating the rare float payload.
fn epoch_field(value: &Value, key: &str) -> Option<i64> {
    let num = value.get(key)?;
    num.as_i64().or_else(|| num.as_f64().map(|f| f as i64))
}

fn rfc3339_utc(epoch: Option<i64>) -> Option<String> {
    epoch
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
