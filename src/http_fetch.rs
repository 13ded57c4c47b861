use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{RETRY_AFTER, USER_AGENT};

use crate::config::FetchConfig;

// Monthly archives for active accounts run to a few megabytes; give slow
// months room before the transport-level retry kicks in.
const REQUEST_TIMEOUT_SECS: u64 = 30;
const BACKOFF_BASE_MS: u64 = 600;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client, built once per process.
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// GET a URL and return the response body, or `None` for 404/410.
///
/// 429 and 5xx responses are retried with backoff up to `cfg.max_retries`
/// times; a numeric `Retry-After` header takes precedence over the computed
/// delay. After a successful response the politeness sleep from `cfg` is
/// applied before returning.
pub fn get_text(client: &Client, cfg: &FetchConfig, url: &str) -> Result<Option<String>> {
    let mut attempt: u32 = 0;
    loop {
        let mut req = client.get(url);
        if let Some(ua) = cfg.user_agent.as_deref() {
            req = req.header(USER_AGENT, ua);
        }
        let resp = match req.send() {
            Ok(resp) => resp,
            Err(err) => {
                if attempt < cfg.max_retries {
                    let delay = backoff_delay(attempt, None);
                    log::warn!("GET {url} failed ({err}), retrying in {delay:?}");
                    thread::sleep(delay);
                    attempt += 1;
                    continue;
                }
                return Err(err).with_context(|| format!("request failed: {url}"));
            }
        };

        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            if attempt < cfg.max_retries {
                let retry_after = resp
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok());
                let delay = backoff_delay(attempt, retry_after);
                log::warn!("GET {url} returned {status}, retrying in {delay:?}");
                thread::sleep(delay);
                attempt += 1;
                continue;
            }
            return Err(anyhow::anyhow!("http {status} for {url}"));
        }

        let body = resp
            .text()
            .with_context(|| format!("failed reading body from {url}"))?;
        if !status.is_success() {
            return Err(anyhow::anyhow!("http {status}: {body}"));
        }
        if !cfg.sleep.is_zero() {
            thread::sleep(cfg.sleep);
        }
        return Ok(Some(body));
    }
}

fn backoff_delay(attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    if let Some(secs) = retry_after_secs {
        return Duration::from_secs(secs.max(1));
    }
    Duration::from_millis(BACKOFF_BASE_MS << attempt)
}
