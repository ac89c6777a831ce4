use crate::models::{Capability, InstrumentType, ProviderId};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::time::Duration;

/// 重试间隔的增长方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    /// delay * attempt
    Linear,
}

/// 每种标的类型的数据源优先级
#[derive(Debug, Clone)]
pub struct ProviderPriority {
    by_type: HashMap<InstrumentType, Vec<ProviderId>>,
}

impl ProviderPriority {
    pub fn empty() -> Self {
        Self {
            by_type: HashMap::new(),
        }
    }

    pub fn with_order(mut self, instrument_type: InstrumentType, order: &[ProviderId]) -> Self {
        self.by_type.insert(instrument_type, order.to_vec());
        self
    }

    /// Explicit order for the type, if one is configured.
    pub fn order_for(&self, instrument_type: InstrumentType) -> Option<&[ProviderId]> {
        self.by_type.get(&instrument_type).map(Vec::as_slice)
    }

    /// Structured APIs rank ahead of scraped tables when no explicit order exists.
    pub fn capability_rank(capability: Capability) -> usize {
        match capability {
            Capability::FetchPriceHistory => 0,
            Capability::FetchSeries => 1,
            Capability::FetchTable => 2,
        }
    }
}

impl Default for ProviderPriority {
    fn default() -> Self {
        use InstrumentType::*;
        use ProviderId::*;

        Self::empty()
            .with_order(IndexUs, &[Yahoo, Akshare, Investing])
            .with_order(IndexHk, &[Akshare, Yahoo, Investing])
            .with_order(IndexCn, &[Akshare, Yahoo, Investing])
            .with_order(StockUs, &[Yahoo, Akshare, Investing])
            .with_order(StockHk, &[Akshare, Yahoo, Investing])
            .with_order(FutureForeign, &[Yahoo, Akshare, Investing])
            .with_order(FutureDomestic, &[Akshare, Investing])
            .with_order(EconomicSeries, &[Fred, Yahoo, Investing, Spreadsheet])
            .with_order(Currency, &[Yahoo, Investing])
            .with_order(ScrapedTable, &[Spreadsheet, Investing])
    }
}

pub struct Config {
    pub report_days: usize,
    pub lookback_days: u32,
    pub freshness_days: i64,
    pub stale_fallback_rows: usize,
    pub max_workers: usize,
    pub ma_windows: Vec<usize>,
    pub min_history: usize,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub retry_backoff: Backoff,
    pub precision: u32,
    pub priority: ProviderPriority,
    pub timezone: Tz,
}

impl Config {
    pub fn new() -> Self {
        Self {
            report_days: 30,
            lookback_days: 300,
            freshness_days: 180,
            stale_fallback_rows: 5,
            max_workers: 5,
            ma_windows: vec![5, 10, 20, 60, 120, 200],
            min_history: 30,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
            retry_backoff: Backoff::Fixed,
            precision: 2,
            priority: ProviderPriority::default(),
            timezone: chrono_tz::Asia::Shanghai,
        }
    }

    pub fn with_report_days(mut self, days: usize) -> Self {
        self.report_days = days;
        self
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn with_freshness_days(mut self, days: i64) -> Self {
        self.freshness_days = days;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    pub fn with_ma_windows(mut self, windows: &[usize]) -> Self {
        self.ma_windows = windows.to_vec();
        self
    }

    pub fn with_min_history(mut self, min: usize) -> Self {
        self.min_history = min;
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration, backoff: Backoff) -> Self {
        self.retry_attempts = attempts.max(1);
        self.retry_delay = delay;
        self.retry_backoff = backoff;
        self
    }

    pub fn with_precision(mut self, decimals: u32) -> Self {
        self.precision = decimals;
        self
    }

    pub fn with_priority(mut self, priority: ProviderPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.timezone = tz;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
