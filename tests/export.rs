use std::fs;
use std::path::PathBuf;

use parquet::file::reader::{FileReader, SerializedFileReader};
use serde_json::json;

use chesscom_harvest::export::{read_ndjson, write_ndjson, write_parquet};
use chesscom_harvest::normalize::normalize_game;
use chesscom_harvest::profile::{Profile, ProfileCache, enrich_record};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("chesscom_harvest_{}_{name}", std::process::id()))
}

fn sample_records() -> Vec<chesscom_harvest::normalize::GameRecord> {
    let games = [
        json!({
            "url": "https://www.chess.com/game/live/1",
            "time_control": "180+2",
            "end_time": 1688926000,
            "rated": true,
            "time_class": "blitz",
            "rules": "chess",
            "pgn": "[ECO \"C50\"]\n[Termination \"Alice won by checkmate\"]\n\n1. e4 e5 2. Qh5 1-0\n",
            "white": {"username": "Alice", "rating": 1520, "result": "win"},
            "black": {"username": "Bob", "rating": 1496, "result": "checkmated"}
        }),
        json!({
            "url": "https://www.chess.com/game/daily/2",
            "time_control": "1/86400",
            "start_time": 1688256000,
            "end_time": 1688342400,
            "time_class": "daily",
            "white": {"username": "Carol", "result": "agreed"},
            "black": {"username": "Alice", "result": "agreed"}
        }),
        json!({}),
    ];
    games.iter().map(|g| normalize_game("alice", g)).collect()
}

#[test]
fn ndjson_round_trip_preserves_records() {
    let records = sample_records();
    let path = temp_path("round_trip.ndjson");

    let wrote = write_ndjson(&path, &records).expect("write should succeed");
    assert_eq!(wrote, records.len());

    let raw = fs::read_to_string(&path).expect("output readable");
    assert_eq!(raw.lines().count(), records.len());

    let back = read_ndjson(&path).expect("read should succeed");
    assert_eq!(back, records);

    fs::remove_file(&path).ok();
}

#[test]
fn ndjson_round_trip_keeps_enrichment_keys() {
    let mut records = sample_records();
    let mut cache = ProfileCache::new();
    enrich_record(&mut records[0], &mut cache, |_| {
        Some(Profile {
            title: Some("GM".to_string()),
            country: Some("https://api.chess.com/pub/country/US".to_string()),
            ..Profile::default()
        })
    });
    let path = temp_path("enriched.ndjson");

    write_ndjson(&path, &records).expect("write should succeed");
    let back = read_ndjson(&path).expect("read should succeed");
    assert_eq!(back[0].user_title.as_deref(), Some("GM"));
    assert_eq!(back[0].user_country_code.as_deref(), Some("US"));
    assert_eq!(back[1].user_title, None);
    assert_eq!(back, records);

    fs::remove_file(&path).ok();
}

#[test]
fn empty_record_set_writes_an_empty_file() {
    let path = temp_path("empty.ndjson");
    let wrote = write_ndjson(&path, &[]).expect("write should succeed");
    assert_eq!(wrote, 0);
    assert_eq!(fs::read_to_string(&path).expect("output readable"), "");
    fs::remove_file(&path).ok();
}

#[test]
fn parquet_sink_writes_one_row_per_record() {
    let records = sample_records();
    let path = temp_path("records.parquet");

    write_parquet(&path, &records).expect("parquet write should succeed");

    let file = fs::File::open(&path).expect("parquet output readable");
    let reader = SerializedFileReader::new(file).expect("valid parquet file");
    let meta = reader.metadata().file_metadata();
    assert_eq!(meta.num_rows(), records.len() as i64);
    let tagged = meta
        .key_value_metadata()
        .map(|kv| kv.iter().any(|e| e.key == "record_schema_version"))
        .unwrap_or(false);
    assert!(tagged, "schema version metadata should be present");

    fs::remove_file(&path).ok();
}
