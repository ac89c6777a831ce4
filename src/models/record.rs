use chrono::NaiveDate;
use serde::Serialize;

/// 归一化后的单个时间序列数据点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
}

impl CanonicalRecord {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
            value: None,
            change_pct: None,
        }
    }

    /// OHLCV 价格点
    pub fn bar(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
            ..Self::new(date)
        }
    }

    /// 宏观序列点，只有 value
    pub fn point(date: NaiveDate, value: f64) -> Self {
        Self {
            value: Some(value),
            ..Self::new(date)
        }
    }

    /// Primary value: close for priced instruments, value for economic series.
    pub fn primary(&self) -> Option<f64> {
        self.close.or(self.value)
    }

    /// A record without close or value carries nothing downstream can use.
    pub fn is_usable(&self) -> bool {
        self.primary().map_or(false, f64::is_finite)
    }
}

/// 带目标名称标签的K线记录，用于报告中的 kline 列表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedRecord {
    pub name: String,
    #[serde(flatten)]
    pub record: CanonicalRecord,
}

impl TaggedRecord {
    pub fn new(name: &str, record: CanonicalRecord) -> Self {
        Self {
            name: name.to_string(),
            record,
        }
    }
}

/// Sort ascending by date and drop duplicate dates, keeping the last occurrence.
pub fn sort_ascending(records: &mut Vec<CanonicalRecord>) {
    records.sort_by(|a, b| a.date.cmp(&b.date));
    let mut deduped: Vec<CanonicalRecord> = Vec::with_capacity(records.len());
    for record in records.drain(..) {
        match deduped.last_mut() {
            Some(last) if last.date == record.date => *last = record,
            _ => deduped.push(record),
        }
    }
    *records = deduped;
}
