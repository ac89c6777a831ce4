use crate::errors::{RadarError, Result};
use crate::models::{CanonicalRecord, Capability, FetchOutcome, ProviderId};
use crate::sources::base::{build_client, check_status, encode_path_segment, RateLimiter, SourceAdapter};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance v8 chart 接口的日线抓取器
pub struct YahooChartSource {
    client: Client,
    limiter: RateLimiter,
    base_url: String,
}

impl YahooChartSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            limiter: RateLimiter::new(Duration::from_millis(500)),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn chart_url(&self, symbol: &str, lookback_days: u32) -> String {
        let end = Utc::now().timestamp();
        let start = end - i64::from(lookback_days) * 86_400;
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            self.base_url,
            encode_path_segment(symbol),
            start,
            end
        )
    }

    async fn download(&self, symbol: &str, lookback_days: u32) -> Result<Vec<CanonicalRecord>> {
        self.limiter.wait().await;

        let response = self.client.get(self.chart_url(symbol, lookback_days)).send().await?;
        if let Some(err) = check_status(response.status(), symbol) {
            return Err(err);
        }
        let text = response.text().await?;
        let chart: ChartResponse = serde_json::from_str(&text)?;
        parse_chart(symbol, chart)
    }
}

fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<CanonicalRecord>> {
    let data = match resp.chart.result.and_then(|r| r.into_iter().next()) {
        Some(data) => data,
        None => {
            return Err(match resp.chart.error {
                Some(err) if err.code == "Not Found" => {
                    RadarError::TerminalAdapter(format!("symbol not found: {}", symbol))
                }
                Some(err) => RadarError::TransientNetwork(format!("{}: {}", err.code, err.description)),
                None => RadarError::EmptyResult(format!("empty chart result for {}", symbol)),
            })
        }
    };

    let timestamps = data.timestamp.unwrap_or_default();
    let quote = match data.indicators.quote.into_iter().next() {
        Some(q) => q,
        None => return Err(RadarError::EmptyResult(format!("no quote data for {}", symbol))),
    };

    let pick = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten().filter(|v| v.is_finite());

    let mut records = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = match chrono::DateTime::from_timestamp(ts, 0) {
            Some(dt) => dt.date_naive(),
            None => continue,
        };
        let close = pick(&quote.close, i);
        // 节假日等无成交的占位行
        if close.is_none() {
            continue;
        }
        records.push(CanonicalRecord {
            open: pick(&quote.open, i),
            high: pick(&quote.high, i),
            low: pick(&quote.low, i),
            close,
            volume: pick(&quote.volume, i),
            ..CanonicalRecord::new(date)
        });
    }

    debug!("{} 解析到 {} 条K线记录", symbol, records.len());
    Ok(records)
}

#[async_trait]
impl SourceAdapter for YahooChartSource {
    fn provider(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn capability(&self) -> Capability {
        Capability::FetchPriceHistory
    }

    async fn fetch_price_history(&self, symbol: &str, lookback_days: u32) -> FetchOutcome {
        info!("获取 {} 的历史K线 (yahoo, {} 天)", symbol, lookback_days);
        let mut outcome = FetchOutcome::from(self.download(symbol, lookback_days).await);
        if let FetchOutcome::Success { records, .. } = &mut outcome {
            crate::models::record::sort_ascending(records);
        }
        outcome
    }
}
