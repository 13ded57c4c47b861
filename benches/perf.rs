use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use chesscom_harvest::normalize::normalize_game;
use chesscom_harvest::pgn_tags::{estimate_move_count, harvest_tags};
use chesscom_harvest::time_control::parse_time_control;

const GAME_JSON: &str = r#"{
  "url": "https://www.chess.com/game/live/88001122",
  "uuid": "f3c5a6de-1f2a-11ee-b5a6-6cfe544c0428",
  "pgn": "[Event \"Live Chess\"]\n[Site \"Chess.com\"]\n[Date \"2023.07.09\"]\n[Round \"-\"]\n[White \"Alice\"]\n[Black \"Bob\"]\n[Result \"1-0\"]\n[ECO \"C50\"]\n[Opening \"Italian Game\"]\n[UTCDate \"2023.07.09\"]\n[UTCTime \"18:05:13\"]\n[TimeControl \"180+2\"]\n[Termination \"Alice won by checkmate\"]\n[Link \"https://www.chess.com/game/live/88001122\"]\n\n1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. c3 Nf6 5. d4 exd4 6. cxd4 Bb4+ 7. Nc3 Nxe4 8. O-O Bxc3 9. d5 Bf6 10. Re1 Ne7 11. Rxe4 d6 12. Bg5 Bxg5 13. Nxg5 h6 14. Qe2 hxg5 15. Re1 Be6 16. dxe6 f6 17. Qh5+ g6 18. Qxg6# 1-0\n",
  "time_control": "180+2",
  "end_time": 1688926000,
  "start_time": 1688925913,
  "rated": true,
  "fen": "rn1qk2r/ppp1n3/3pPpQ1/6p1/8/8/PP2QPPP/4R1K1 b kq -",
  "time_class": "blitz",
  "rules": "chess",
  "white": {"rating": 1520, "result": "win", "username": "Alice"},
  "black": {"rating": 1496, "result": "checkmated", "username": "Bob"},
  "accuracies": {"white": 92.4, "black": 61.8}
}"#;

fn bench_normalize_game(c: &mut Criterion) {
    let game: serde_json::Value = serde_json::from_str(GAME_JSON).expect("valid game json");
    c.bench_function("normalize_game", |b| {
        b.iter(|| {
            let rec = normalize_game(black_box("alice"), black_box(&game));
            black_box(rec.points_user);
        })
    });
}

fn bench_harvest_tags(c: &mut Criterion) {
    let game: serde_json::Value = serde_json::from_str(GAME_JSON).expect("valid game json");
    let pgn = game
        .get("pgn")
        .and_then(|v| v.as_str())
        .expect("fixture has pgn")
        .to_string();
    c.bench_function("harvest_tags", |b| {
        b.iter(|| {
            let tags = harvest_tags(black_box(&pgn));
            black_box(tags.len());
        })
    });
    c.bench_function("estimate_move_count", |b| {
        b.iter(|| black_box(estimate_move_count(black_box(&pgn))))
    });
}

fn bench_time_control(c: &mut Criterion) {
    c.bench_function("parse_time_control", |b| {
        b.iter(|| black_box(parse_time_control(black_box(Some("180+2")))))
    });
}

criterion_group!(
    benches,
    bench_normalize_game,
    bench_harvest_tags,
    bench_time_control
);
criterion_main!(benches);
