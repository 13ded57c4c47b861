use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::FetchConfig;
use crate::http_fetch::get_text;

#[derive(Debug, Deserialize, Default)]
struct ArchiveIndex {
    #[serde(default)]
    archives: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct MonthGames {
    #[serde(default)]
    games: Vec<Value>,
}

/// Ordered list of monthly archive URLs for an account. A missing user or
/// an account with no games yields an empty list.
pub fn list_archives(client: &Client, cfg: &FetchConfig, username: &str) -> Result<Vec<String>> {
    let url = cfg.archives_url(username);
    let Some(body) = get_text(client, cfg, &url)? else {
        return Ok(Vec::new());
    };
    parse_archives_json(&body)
}

/// Raw game payloads for one monthly archive. The payloads stay opaque
/// (`Value`) so the normalizer can carry them through verbatim.
pub fn fetch_month_games(
    client: &Client,
    cfg: &FetchConfig,
    archive_url: &str,
) -> Result<Vec<Value>> {
    let Some(body) = get_text(client, cfg, archive_url)? else {
        return Ok(Vec::new());
    };
    parse_month_games_json(&body)
}

pub fn parse_archives_json(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let parsed: ArchiveIndex = serde_json::from_str(trimmed).context("invalid archives json")?;
    Ok(parsed.archives)
}

pub fn parse_month_games_json(raw: &str) -> Result<Vec<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let parsed: MonthGames = serde_json::from_str(trimmed).context("invalid month games json")?;
    Ok(parsed.games)
}
