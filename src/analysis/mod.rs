//! 均线与技术信号计算
//!
//! 输入为按日期升序排列的规范记录。历史长度不足 `min_history` 时返回
//! [`Analysis::InsufficientData`]，由调用方记为降级而非失败。

pub mod indicators;

use crate::models::{CanonicalRecord, SeriesSummary, Signal, TechnicalSignalSet};
use std::collections::{BTreeMap, BTreeSet};

const RSI_OVERBOUGHT: f64 = 80.0;
const RSI_OVERSOLD: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    Complete(TechnicalSignalSet),
    InsufficientData { available: usize, required: usize },
}

pub struct TechnicalAnalyzer {
    windows: Vec<usize>,
    min_history: usize,
}

impl TechnicalAnalyzer {
    pub fn new(windows: &[usize], min_history: usize) -> Self {
        Self {
            windows: windows.to_vec(),
            min_history: min_history.max(2),
        }
    }

    pub fn moving_averages(&self, closes: &[f64]) -> BTreeMap<usize, Option<f64>> {
        self.windows
            .iter()
            .map(|&w| (w, indicators::sma_latest(closes, w)))
            .collect()
    }

    pub fn analyze(&self, records: &[CanonicalRecord]) -> Analysis {
        let usable: Vec<&CanonicalRecord> = records.iter().filter(|r| r.is_usable()).collect();
        if usable.len() < self.min_history {
            return Analysis::InsufficientData {
                available: usable.len(),
                required: self.min_history,
            };
        }

        let mut close = Vec::with_capacity(usable.len());
        let mut high = Vec::with_capacity(usable.len());
        let mut low = Vec::with_capacity(usable.len());
        for r in &usable {
            let c = r.primary().unwrap_or_default();
            close.push(c);
            high.push(r.high.unwrap_or(c).max(c));
            low.push(r.low.unwrap_or(c).min(c));
        }

        let macd = indicators::macd(&close, 12, 26, 9);
        let kdj = indicators::kdj(&close, &high, &low, 9, 3, 3);
        let rsi6 = indicators::rsi(&close, 6);

        let mut signals = BTreeSet::new();
        let n = close.len();
        let (dif, dea) = (&macd.dif, &macd.dea);
        if dif[n - 2] < dea[n - 2] && dif[n - 1] > dea[n - 1] {
            signals.insert(Signal::MacdGoldenCross);
        } else if dif[n - 2] > dea[n - 2] && dif[n - 1] < dea[n - 1] {
            signals.insert(Signal::MacdDeathCross);
        }
        if kdj.k[n - 2] < kdj.d[n - 2] && kdj.k[n - 1] > kdj.d[n - 1] {
            signals.insert(Signal::KdjGoldenCross);
        }
        let latest_rsi = rsi6[n - 1];
        if latest_rsi > RSI_OVERBOUGHT {
            signals.insert(Signal::RsiOverbought);
        } else if latest_rsi < RSI_OVERSOLD {
            signals.insert(Signal::RsiOversold);
        }

        Analysis::Complete(TechnicalSignalSet {
            macd: macd.histogram[n - 1],
            dif: dif[n - 1],
            dea: dea[n - 1],
            k: kdj.k[n - 1],
            d: kdj.d[n - 1],
            j: kdj.j[n - 1],
            rsi6: latest_rsi,
            signals,
        })
    }

    /// Summary plus an optional degraded note; `None` when nothing is usable.
    pub fn summarize(&self, name: &str, records: &[CanonicalRecord]) -> Option<(SeriesSummary, Option<String>)> {
        let usable: Vec<&CanonicalRecord> = records.iter().filter(|r| r.is_usable()).collect();
        let latest = usable.last()?;
        let closes: Vec<f64> = usable.iter().filter_map(|r| r.primary()).collect();

        let (signals, note) = match self.analyze(records) {
            Analysis::Complete(set) => (Some(set), None),
            Analysis::InsufficientData { available, required } => (
                None,
                Some(format!("insufficient data for technical signals ({}/{})", available, required)),
            ),
        };

        let summary = SeriesSummary {
            name: name.to_string(),
            latest_close: latest.primary().unwrap_or_default(),
            date: latest.date,
            moving_averages: self.moving_averages(&closes),
            signals,
        };
        Some((summary, note))
    }
}
