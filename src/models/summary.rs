use crate::models::record::TaggedRecord;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// 离散技术形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Signal {
    MacdGoldenCross,
    MacdDeathCross,
    KdjGoldenCross,
    RsiOverbought,
    RsiOversold,
}

impl Signal {
    pub fn label(&self) -> &'static str {
        match self {
            Signal::MacdGoldenCross => "MACD金叉",
            Signal::MacdDeathCross => "MACD死叉",
            Signal::KdjGoldenCross => "KDJ金叉",
            Signal::RsiOverbought => "RSI超买",
            Signal::RsiOversold => "RSI超卖",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Signal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// 最新一期的 MACD / KDJ / RSI 指标及信号
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalSignalSet {
    #[serde(rename = "MACD")]
    pub macd: f64,
    #[serde(rename = "DIF")]
    pub dif: f64,
    #[serde(rename = "DEA")]
    pub dea: f64,
    #[serde(rename = "K")]
    pub k: f64,
    #[serde(rename = "D")]
    pub d: f64,
    #[serde(rename = "J")]
    pub j: f64,
    #[serde(rename = "RSI6")]
    pub rsi6: f64,
    pub signals: BTreeSet<Signal>,
}

/// 单个标的的衍生指标
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub name: String,
    pub latest_close: f64,
    pub date: NaiveDate,
    /// Keyed by window length; `None` when history is shorter than the window.
    pub moving_averages: BTreeMap<usize, Option<f64>>,
    pub signals: Option<TechnicalSignalSet>,
}

/// 每个标的每次运行恰好一条
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLogEntry {
    pub target_name: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl StatusLogEntry {
    pub fn passed(name: &str) -> Self {
        Self {
            target_name: name.to_string(),
            succeeded: true,
            error: None,
            degraded: None,
        }
    }

    pub fn failed(name: &str, error: impl Into<String>) -> Self {
        Self {
            target_name: name.to_string(),
            succeeded: false,
            error: Some(error.into()),
            degraded: None,
        }
    }

    pub fn with_degraded(mut self, note: Option<String>) -> Self {
        self.degraded = note;
        self
    }
}

impl fmt::Display for StatusLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.succeeded { "PASS" } else { "FAIL" };
        write!(f, "[{}] {}", status, self.target_name)?;
        if let Some(error) = &self.error {
            write!(f, " | {}", error)?;
        } else if let Some(note) = &self.degraded {
            write!(f, " | degraded: {}", note)?;
        }
        Ok(())
    }
}

/// 一个分组的采集结果
#[derive(Debug, Clone, Default)]
pub struct GroupResult {
    pub group_name: String,
    pub klines: Vec<TaggedRecord>,
    pub summaries: Vec<SeriesSummary>,
    pub logs: Vec<StatusLogEntry>,
}

impl GroupResult {
    pub fn new(group_name: &str) -> Self {
        Self {
            group_name: group_name.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_logs(logs: &[StatusLogEntry]) -> Self {
        let passed = logs.iter().filter(|l| l.succeeded).count();
        Self {
            total: logs.len(),
            passed,
            failed: logs.len() - passed,
        }
    }
}
