use std::collections::HashMap;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::FetchConfig;
use crate::http_fetch::get_text;
use crate::normalize::GameRecord;

/// Public profile attributes for one account. Everything is optional; the
/// API omits fields freely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub username: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    /// Country reference URL; the two-letter code is its trailing segment.
    pub country: Option<String>,
    pub joined: Option<i64>,
    pub last_online: Option<i64>,
    pub fide: Option<i64>,
    pub verified: Option<bool>,
}

static COUNTRY_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/country/([A-Za-z]{2})$").expect("country code regex"));

pub fn parse_profile_json(raw: &str) -> Result<Option<Profile>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let profile = serde_json::from_str(trimmed).context("invalid profile json")?;
    Ok(Some(profile))
}

pub fn fetch_profile(
    client: &Client,
    cfg: &FetchConfig,
    username: &str,
) -> Result<Option<Profile>> {
    if username.is_empty() {
        return Ok(None);
    }
    let url = cfg.player_url(username);
    let Some(body) = get_text(client, cfg, &url)? else {
        return Ok(None);
    };
    parse_profile_json(&body)
}

/// In-run memo of profile lookups, keyed by lowercased username. Negative
/// results are stored too, so a missing account is fetched exactly once.
#[derive(Debug, Default)]
pub struct ProfileCache {
    entries: HashMap<String, Option<Profile>>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get-or-populate: the lookup runs only on first encounter of a
    /// username, and its result (present or not) is stored before reading.
    pub fn resolve(
        &mut self,
        username: Option<&str>,
        mut lookup: impl FnMut(&str) -> Option<Profile>,
    ) -> Option<&Profile> {
        let name = username?;
        if name.is_empty() {
            return None;
        }
        let key = name.to_lowercase();
        if !self.entries.contains_key(&key) {
            let fetched = lookup(name);
            self.entries.insert(key.clone(), fetched);
        }
        self.entries.get(&key).and_then(|p| p.as_ref())
    }
}

/// Graft profile attributes for both sides onto a normalized record. A
/// username without a profile leaves its keys untouched (absent on the
/// wire), keeping the record schema-compatible with the unenriched case.
pub fn enrich_record(
    rec: &mut GameRecord,
    cache: &mut ProfileCache,
    mut lookup: impl FnMut(&str) -> Option<Profile>,
) {
    let user_prof = cache
        .resolve(Some(rec.username.as_str()), &mut lookup)
        .cloned();
    let opp_prof = cache
        .resolve(rec.opponent_username.as_deref(), &mut lookup)
        .cloned();

    if let Some(prof) = user_prof {
        rec.user_title = prof.title;
        rec.user_status = prof.status;
        rec.user_name_full = prof.name;
        rec.user_location = prof.location;
        rec.user_country_code = country_code_from_url(prof.country.as_deref());
        rec.user_joined = prof.joined;
        rec.user_last_online = prof.last_online;
        rec.user_fide = prof.fide;
        rec.user_verified = prof.verified;
    }

    if let Some(prof) = opp_prof {
        rec.opponent_title = prof.title;
        rec.opponent_status = prof.status;
        rec.opponent_name_full = prof.name;
        rec.opponent_location = prof.location;
        rec.opponent_country_code = country_code_from_url(prof.country.as_deref());
        rec.opponent_joined = prof.joined;
        rec.opponent_last_online = prof.last_online;
        rec.opponent_fide = prof.fide;
        rec.opponent_verified = prof.verified;
    }
}

/// Two-letter code from the trailing path segment of a country reference
/// URL, e.g. `https://api.chess.com/pub/country/US` -> `US`.
pub fn country_code_from_url(url: Option<&str>) -> Option<String> {
    let url = url?;
    COUNTRY_CODE_RE
        .captures(url)
        .map(|caps| caps[1].to_string())
}
