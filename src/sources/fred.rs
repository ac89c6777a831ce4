use crate::errors::Result;
use crate::models::{CanonicalRecord, Capability, FetchOutcome, ProviderId};
use crate::normalizer::parse::{parse_date, parse_number};
use crate::sources::base::{build_client, check_status, RateLimiter, SourceAdapter};
use async_trait::async_trait;
use chrono::{Duration as DateDuration, Utc};
use log::info;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org";

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

/// FRED 经济数据序列
pub struct FredSource {
    client: Client,
    limiter: RateLimiter,
    api_key: String,
    base_url: String,
}

impl FredSource {
    pub fn new(api_key: &str) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            limiter: RateLimiter::new(Duration::from_millis(500)),
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn download(&self, series_id: &str, lookback_days: u32) -> Result<Vec<CanonicalRecord>> {
        self.limiter.wait().await;

        let start = (Utc::now() - DateDuration::days(i64::from(lookback_days)))
            .format("%Y-%m-%d")
            .to_string();
        let response = self
            .client
            .get(format!("{}/fred/series/observations", self.base_url))
            .query(&[
                ("series_id", series_id),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("observation_start", start.as_str()),
            ])
            .send()
            .await?;
        if let Some(err) = check_status(response.status(), series_id) {
            return Err(err);
        }

        let body: ObservationsResponse = response.json().await?;
        Ok(parse_observations(body))
    }
}

/// FRED 用 "." 表示缺失值，这类观测直接跳过
fn parse_observations(body: ObservationsResponse) -> Vec<CanonicalRecord> {
    let mut records: Vec<CanonicalRecord> = body
        .observations
        .iter()
        .filter_map(|o| Some(CanonicalRecord::point(parse_date(&o.date)?, parse_number(&o.value)?)))
        .collect();
    crate::models::record::sort_ascending(&mut records);
    records
}

#[async_trait]
impl SourceAdapter for FredSource {
    fn provider(&self) -> ProviderId {
        ProviderId::Fred
    }

    fn capability(&self) -> Capability {
        Capability::FetchSeries
    }

    async fn fetch_series(&self, series_id: &str, lookback_days: u32) -> FetchOutcome {
        info!("获取 FRED 序列 {} ({} 天)", series_id, lookback_days);
        self.download(series_id, lookback_days).await.into()
    }
}
