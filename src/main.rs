use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;

use chesscom_harvest::archive_fetch::{fetch_month_games, list_archives};
use chesscom_harvest::config::FetchConfig;
use chesscom_harvest::export::{write_ndjson, write_parquet};
use chesscom_harvest::http_fetch::http_client;
use chesscom_harvest::normalize::{GameRecord, normalize_game};
use chesscom_harvest::profile::{ProfileCache, enrich_record, fetch_profile};

const USAGE: &str = "usage: chesscom_harvest --username <name> --out ndjson:<path> \
[--parquet <path>] [--sleep <secs>] [--max-retries <n>] [--user-agent <ua>] [--enrich-profiles]";

struct CliArgs {
    username: String,
    ndjson_path: PathBuf,
    parquet_path: Option<PathBuf>,
    sleep_secs: Option<f64>,
    max_retries: Option<u32>,
    user_agent: Option<String>,
    enrich_profiles: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = match parse_args(std::env::args().skip(1).collect()) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(args: CliArgs) -> Result<ExitCode> {
    let mut cfg = FetchConfig::from_env();
    if let Some(sleep) = args.sleep_secs {
        cfg.sleep = Duration::from_secs_f64(sleep.max(0.0));
    }
    if let Some(retries) = args.max_retries {
        cfg.max_retries = retries;
    }
    if let Some(ua) = args.user_agent.clone() {
        cfg.user_agent = Some(ua);
    }

    let client = http_client()?;

    let archives = list_archives(client, &cfg, &args.username)?;
    if archives.is_empty() {
        println!("No archives found or user not found.");
        return Ok(ExitCode::from(1));
    }

    let total = archives.len();
    let mut records: Vec<GameRecord> = Vec::new();
    let mut profile_cache = ProfileCache::new();
    for (idx, archive_url) in archives.iter().enumerate() {
        let games = fetch_month_games(client, &cfg, archive_url)?;
        println!(
            "archive {}/{}: {} games={}",
            idx + 1,
            total,
            archive_label(archive_url),
            games.len()
        );
        for game in &games {
            let mut rec = normalize_game(&args.username, game);
            if args.enrich_profiles {
                enrich_record(&mut rec, &mut profile_cache, |name| {
                    match fetch_profile(client, &cfg, name) {
                        Ok(profile) => profile,
                        Err(err) => {
                            log::warn!("profile fetch failed for {name}: {err:#}");
                            None
                        }
                    }
                });
            }
            records.push(rec);
        }
    }

    let wrote = write_ndjson(&args.ndjson_path, &records)?;
    println!("Wrote {wrote} games to {}", args.ndjson_path.display());
    if args.enrich_profiles {
        println!("Profiles looked up: {}", profile_cache.len());
    }
    if let Some(parquet_path) = &args.parquet_path {
        write_parquet(parquet_path, &records)?;
        println!("Wrote parquet to {}", parquet_path.display());
    }

    Ok(ExitCode::SUCCESS)
}

/// Last two path segments of an archive URL, e.g. ".../2023/07" -> "2023/07".
fn archive_label(url: &str) -> String {
    let mut parts = url.trim_end_matches('/').rsplit('/');
    let month = parts.next().unwrap_or_default();
    let year = parts.next().unwrap_or_default();
    if year.is_empty() || month.is_empty() {
        url.to_string()
    } else {
        format!("{year}/{month}")
    }
}

fn parse_args(args: Vec<String>) -> Result<CliArgs, String> {
    let mut username: Option<String> = None;
    let mut out: Option<String> = None;
    let mut parquet_path: Option<PathBuf> = None;
    let mut sleep_secs: Option<f64> = None;
    let mut max_retries: Option<u32> = None;
    let mut user_agent: Option<String> = None;
    let mut enrich_profiles = false;

    let mut idx = 0;
    while idx < args.len() {
        let arg = &args[idx];
        if let Some(value) = arg.strip_prefix("--username=") {
            username = Some(value.to_string());
        } else if arg == "--username" {
            username = Some(take_value(&args, &mut idx, "--username")?);
        } else if let Some(value) = arg.strip_prefix("--out=") {
            out = Some(value.to_string());
        } else if arg == "--out" {
            out = Some(take_value(&args, &mut idx, "--out")?);
        } else if let Some(value) = arg.strip_prefix("--parquet=") {
            parquet_path = Some(PathBuf::from(value));
        } else if arg == "--parquet" {
            parquet_path = Some(PathBuf::from(take_value(&args, &mut idx, "--parquet")?));
        } else if let Some(value) = arg.strip_prefix("--sleep=") {
            sleep_secs = Some(parse_number(value, "--sleep")?);
        } else if arg == "--sleep" {
            let value = take_value(&args, &mut idx, "--sleep")?;
            sleep_secs = Some(parse_number(&value, "--sleep")?);
        } else if let Some(value) = arg.strip_prefix("--max-retries=") {
            max_retries = Some(parse_number(value, "--max-retries")?);
        } else if arg == "--max-retries" {
            let value = take_value(&args, &mut idx, "--max-retries")?;
            max_retries = Some(parse_number(&value, "--max-retries")?);
        } else if let Some(value) = arg.strip_prefix("--user-agent=") {
            user_agent = Some(value.to_string());
        } else if arg == "--user-agent" {
            user_agent = Some(take_value(&args, &mut idx, "--user-agent")?);
        } else if arg == "--enrich-profiles" {
            enrich_profiles = true;
        } else {
            return Err(format!("unknown argument: {arg}"));
        }
        idx += 1;
    }

    let username = username
        .filter(|u| !u.trim().is_empty())
        .ok_or("--username is required")?;
    let out = out.ok_or("--out is required")?;
    let ndjson_path = match out.strip_prefix("ndjson:") {
        Some(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => return Err("--out must be in form ndjson:/path/to/file.ndjson".to_string()),
    };

    Ok(CliArgs {
        username,
        ndjson_path,
        parquet_path,
        sleep_secs,
        max_retries,
        user_agent,
        enrich_profiles,
    })
}

fn take_value(args: &[String], idx: &mut usize, flag: &str) -> Result<String, String> {
    *idx += 1;
    args.get(*idx)
        .cloned()
        .ok_or_else(|| format!("missing value for {flag}"))
}

fn parse_number<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<T, String> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| format!("invalid value for {flag}: {raw}"))
}
