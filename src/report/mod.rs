//! 报告聚合：合并各分组与宏观结果，清理数值，整理状态日志

pub mod value;

pub use value::{clean, deep_merge, ReportMap, ReportValue};

use crate::models::{GroupResult, RunSummary, SeriesSummary, StatusLogEntry, TaggedRecord};
use std::collections::{BTreeMap, HashMap};

/// Sections every report carries, even when nothing was collected into them.
pub const SECTIONS: [&str; 4] = ["market_fx", "china", "usa", "japan"];

/// 均线汇总所属的子表
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MaCategory {
    General,
    Commodities,
}

impl MaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaCategory::General => "general",
            MaCategory::Commodities => "commodities",
        }
    }
}

/// 最终报告及其状态日志
#[derive(Debug, Clone)]
pub struct FinishedReport {
    pub tree: ReportValue,
    pub logs: Vec<StatusLogEntry>,
    pub summary: RunSummary,
}

/// Report under construction. Klines and summaries are keyed by target name,
/// so merging the same group twice leaves the report unchanged.
pub struct Report {
    precision: u32,
    klines: BTreeMap<String, BTreeMap<String, Vec<TaggedRecord>>>,
    ma_data: BTreeMap<MaCategory, BTreeMap<String, SeriesSummary>>,
    sections: ReportMap,
    logs: Vec<StatusLogEntry>,
}

impl Report {
    pub fn new(precision: u32) -> Self {
        Self {
            precision,
            klines: BTreeMap::new(),
            ma_data: BTreeMap::new(),
            sections: ReportMap::new(),
            logs: Vec::new(),
        }
    }

    pub fn merge_group(&mut self, group: &GroupResult, category: MaCategory) {
        let mut by_name: BTreeMap<String, Vec<TaggedRecord>> = BTreeMap::new();
        for record in &group.klines {
            by_name.entry(record.name.clone()).or_default().push(record.clone());
        }
        let klines = self.klines.entry(group.group_name.clone()).or_default();
        for (name, mut records) in by_name {
            records.sort_by(|a, b| b.record.date.cmp(&a.record.date));
            records.dedup_by(|a, b| a.record.date == b.record.date);
            klines.insert(name, records);
        }

        let summaries = self.ma_data.entry(category).or_default();
        for summary in &group.summaries {
            summaries.insert(summary.name.clone(), summary.clone());
        }

        self.merge_logs(&group.logs);
    }

    /// Deep-merge a partial tree, e.g. `{"usa": {...}}`.
    pub fn merge_tree(&mut self, partial: ReportMap) {
        deep_merge(&mut self.sections, partial);
    }

    pub fn merge_logs(&mut self, logs: &[StatusLogEntry]) {
        self.logs.extend_from_slice(logs);
    }

    pub fn finish(&self, mut meta: ReportMap) -> FinishedReport {
        let logs = dedupe_logs(&self.logs);
        let summary = RunSummary::from_logs(&logs);
        meta.insert("total".to_string(), summary.total.into());
        meta.insert("passed".to_string(), summary.passed.into());
        meta.insert("failed".to_string(), summary.failed.into());

        let data: ReportMap = self
            .klines
            .iter()
            .map(|(group, targets)| {
                let rows: Vec<ReportValue> = targets.values().flatten().map(record_value).collect();
                (group.clone(), ReportValue::List(rows))
            })
            .collect();

        let mut ma_data = ReportMap::new();
        for category in [MaCategory::General, MaCategory::Commodities] {
            let rows: Vec<ReportValue> = self
                .ma_data
                .get(&category)
                .map(|s| s.values().map(summary_value).collect())
                .unwrap_or_default();
            ma_data.insert(category.as_str().to_string(), ReportValue::List(rows));
        }

        let mut root = ReportMap::new();
        root.insert("meta".to_string(), meta.into());
        root.insert("data".to_string(), data.into());
        root.insert("ma_data".to_string(), ma_data.into());
        for section in SECTIONS {
            root.insert(section.to_string(), ReportValue::empty_map());
        }
        deep_merge(&mut root, self.sections.clone());

        FinishedReport {
            tree: clean(ReportValue::Map(root), self.precision),
            logs,
            summary,
        }
    }
}

/// One entry per target: a success wins over failures, otherwise the last failure is kept.
pub fn dedupe_logs(logs: &[StatusLogEntry]) -> Vec<StatusLogEntry> {
    let mut out: Vec<StatusLogEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for entry in logs {
        match index.get(&entry.target_name) {
            Some(&i) => {
                if !out[i].succeeded {
                    out[i] = entry.clone();
                }
            }
            None => {
                index.insert(entry.target_name.clone(), out.len());
                out.push(entry.clone());
            }
        }
    }
    out
}

pub fn record_value(tagged: &TaggedRecord) -> ReportValue {
    let r = &tagged.record;
    let mut map = ReportMap::new();
    map.insert("name".to_string(), tagged.name.as_str().into());
    map.insert("date".to_string(), r.date.format("%Y-%m-%d").to_string().into());
    let fields = [
        ("open", r.open),
        ("high", r.high),
        ("low", r.low),
        ("close", r.close),
        ("volume", r.volume),
        ("value", r.value),
        ("change_pct", r.change_pct),
    ];
    for (key, field) in fields {
        if let Some(v) = field {
            map.insert(key.to_string(), v.into());
        }
    }
    map.into()
}

pub fn summary_value(summary: &SeriesSummary) -> ReportValue {
    let mut map = ReportMap::new();
    map.insert("name".to_string(), summary.name.as_str().into());
    map.insert("latest_close".to_string(), summary.latest_close.into());
    map.insert("date".to_string(), summary.date.format("%Y-%m-%d").to_string().into());
    for (window, ma) in &summary.moving_averages {
        map.insert(format!("MA{}", window), (*ma).into());
    }
    if let Some(set) = &summary.signals {
        let indicators = [
            ("MACD", set.macd),
            ("DIF", set.dif),
            ("DEA", set.dea),
            ("K", set.k),
            ("D", set.d),
            ("J", set.j),
            ("RSI6", set.rsi6),
        ];
        for (key, v) in indicators {
            map.insert(key.to_string(), v.into());
        }
        let labels: Vec<ReportValue> = set.signals.iter().map(|s| s.label().into()).collect();
        map.insert("signals".to_string(), ReportValue::List(labels));
    }
    map.into()
}
