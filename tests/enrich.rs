use serde_json::json;

use chesscom_harvest::normalize::normalize_game;
use chesscom_harvest::profile::{Profile, ProfileCache, enrich_record};

fn sample_game() -> serde_json::Value {
    json!({
        "white": {"username": "Alice", "rating": 1520, "result": "win"},
        "black": {"username": "Bob", "rating": 1496, "result": "resigned"}
    })
}

fn alice_profile() -> Profile {
    Profile {
        username: Some("alice".to_string()),
        title: Some("WFM".to_string()),
        status: Some("premium".to_string()),
        name: Some("Alice Example".to_string()),
        location: Some("Oslo".to_string()),
        country: Some("https://api.chess.com/pub/country/NO".to_string()),
        joined: Some(1_496_000_000),
        last_online: Some(1_688_926_400),
        fide: Some(2105),
        verified: Some(true),
    }
}

#[test]
fn found_profiles_graft_both_sides() {
    let mut rec = normalize_game("alice", &sample_game());
    let mut cache = ProfileCache::new();
    enrich_record(&mut rec, &mut cache, |name| {
        if name.eq_ignore_ascii_case("alice") {
            Some(alice_profile())
        } else {
            Some(Profile {
                username: Some(name.to_lowercase()),
                country: Some("https://api.chess.com/pub/country/SE".to_string()),
                ..Profile::default()
            })
        }
    });

    assert_eq!(rec.user_title.as_deref(), Some("WFM"));
    assert_eq!(rec.user_country_code.as_deref(), Some("NO"));
    assert_eq!(rec.user_fide, Some(2105));
    assert_eq!(rec.user_verified, Some(true));
    assert_eq!(rec.opponent_country_code.as_deref(), Some("SE"));
    assert_eq!(rec.opponent_title, None);
    assert_eq!(cache.len(), 2);
}

#[test]
fn missing_profile_leaves_keys_absent_on_the_wire() {
    let mut rec = normalize_game("alice", &sample_game());
    let mut cache = ProfileCache::new();
    enrich_record(&mut rec, &mut cache, |name| {
        if name.eq_ignore_ascii_case("alice") {
            Some(alice_profile())
        } else {
            None
        }
    });

    assert_eq!(rec.opponent_title, None);
    assert_eq!(rec.opponent_country_code, None);
    // The record still carries everything else.
    assert!(rec.is_win);
    assert_eq!(rec.opponent_rating, Some(1496));

    let line = serde_json::to_string(&rec).expect("record serializes");
    assert!(line.contains("\"user_title\":\"WFM\""));
    assert!(!line.contains("opponent_title"));
    assert!(!line.contains("opponent_country_code"));
}

#[test]
fn lookups_are_cached_across_records() {
    let mut cache = ProfileCache::new();
    let mut calls = 0;
    for _ in 0..3 {
        let mut rec = normalize_game("alice", &sample_game());
        enrich_record(&mut rec, &mut cache, |_| {
            calls += 1;
            None
        });
    }
    // Two usernames, three records, two lookups total.
    assert_eq!(calls, 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn unenriched_record_has_no_profile_keys() {
    let rec = normalize_game("alice", &sample_game());
    let line = serde_json::to_string(&rec).expect("record serializes");
    assert!(!line.contains("user_title"));
    assert!(!line.contains("opponent_verified"));
}
