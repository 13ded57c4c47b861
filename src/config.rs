use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.chess.com/pub";

const DEFAULT_SLEEP_SECS: f64 = 0.5;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Resolved once at startup and passed into every fetch call.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub api_base: String,
    /// Pause after each successful request; keeps us polite toward the API.
    pub sleep: Duration,
    pub max_retries: u32,
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            sleep: Duration::from_secs_f64(DEFAULT_SLEEP_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            user_agent: None,
        }
    }
}

impl FetchConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(base) = env_string("CHESSCOM_API_BASE") {
            cfg.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(sleep) = env_parse::<f64>("CHESSCOM_SLEEP_SECS") {
            cfg.sleep = Duration::from_secs_f64(sleep.max(0.0));
        }
        if let Some(retries) = env_parse::<u32>("CHESSCOM_MAX_RETRIES") {
            cfg.max_retries = retries;
        }
        cfg.user_agent = env_string("CHESSCOM_USER_AGENT");
        cfg
    }

    pub fn player_url(&self, username: &str) -> String {
        format!("{}/player/{username}", self.api_base)
    }

    pub fn archives_url(&self, username: &str) -> String {
        format!("{}/player/{username}/games/archives", self.api_base)
    }
}

fn env_string(key: &str) -> Option<String> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key)?.parse::<T>().ok()
}
