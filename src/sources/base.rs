use crate::errors::{RadarError, Result};
use crate::models::{Capability, FetchOutcome, ProviderId};
use crate::normalizer::RawTable;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

/// Base trait for provider adapters.
///
/// Each adapter advertises one capability; the fallback chain only calls the
/// method matching it. The default bodies report the capability as unsupported.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Provider this adapter talks to
    fn provider(&self) -> ProviderId;

    fn capability(&self) -> Capability;

    /// Daily price history for an equity/index/future symbol
    async fn fetch_price_history(&self, symbol: &str, _lookback_days: u32) -> FetchOutcome {
        FetchOutcome::terminal(format!("{} does not serve price history for {}", self.provider(), symbol))
    }

    /// Economic or macro series observations
    async fn fetch_series(&self, series_id: &str, _lookback_days: u32) -> FetchOutcome {
        FetchOutcome::terminal(format!("{} does not serve series {}", self.provider(), series_id))
    }

    /// Tables found at a page or file URL; fed to the table normalizer
    async fn fetch_table(&self, url: &str, _table_hint: Option<&str>) -> Result<Vec<RawTable>> {
        Err(RadarError::TerminalAdapter(format!(
            "{} does not serve tables ({})",
            self.provider(),
            url
        )))
    }
}

/// 请求频率限制：两次请求之间至少间隔 `min_interval`
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(instant) = *last {
            let elapsed = instant.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("等待 {:?} 以遵守频率限制", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }
        *last = Some(Instant::now());
    }
}

pub fn build_client() -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Map an HTTP status to an error; `None` for success.
pub fn check_status(status: StatusCode, what: &str) -> Option<RadarError> {
    if status.is_success() {
        return None;
    }
    let message = format!("{}: HTTP status {}", what, status);
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT {
        Some(RadarError::TransientNetwork(message))
    } else {
        Some(RadarError::TerminalAdapter(message))
    }
}

/// 路径段编码，处理 `^GSPC`、`GC=F` 之类的代码
pub fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_index_and_future_symbols() {
        assert_eq!(encode_path_segment("^GSPC"), "%5EGSPC");
        assert_eq!(encode_path_segment("GC=F"), "GC%3DF");
        assert_eq!(encode_path_segment("0700.HK"), "0700.HK");
    }

    #[test]
    fn classifies_http_statuses() {
        assert!(check_status(StatusCode::OK, "x").is_none());
        assert!(matches!(
            check_status(StatusCode::BAD_GATEWAY, "x"),
            Some(RadarError::TransientNetwork(_))
        ));
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, "x"),
            Some(RadarError::TerminalAdapter(_))
        ));
    }

    #[tokio::test]
    async fn rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(30));
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
