//! 表格归一化：将任意抓取或 SDK 返回的表格转换为规范时间序列记录。

pub mod columns;
pub mod parse;
pub mod table;

pub use columns::{resolve_columns, CanonicalField, ColumnMap};
pub use table::RawTable;

use crate::errors::{RadarError, Result};
use crate::models::{CanonicalRecord, FetchOutcome};
use chrono::{Duration, NaiveDate};
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    /// Newest first, for latest-value lookups.
    Descending,
}

/// 归一化结果
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub records: Vec<CanonicalRecord>,
    /// Set when the stale-source rule replaced the requested window.
    pub degraded: Option<String>,
    pub dropped_rows: usize,
}

impl Normalized {
    pub fn into_outcome(self) -> FetchOutcome {
        if self.records.is_empty() {
            return FetchOutcome::Empty;
        }
        FetchOutcome::Success {
            records: self.records,
            degraded: self.degraded,
        }
    }
}

pub struct TableNormalizer {
    window_days: i64,
    stale_rows: usize,
}

impl TableNormalizer {
    pub fn new(window_days: i64, stale_rows: usize) -> Self {
        Self {
            window_days,
            stale_rows: stale_rows.max(1),
        }
    }

    pub fn normalize(&self, table: &RawTable, today: NaiveDate, order: SortOrder) -> Result<Normalized> {
        let columns = resolve_columns(&table.headers);
        if !columns.is_usable() {
            return Err(RadarError::ParseError(format!(
                "no date/value columns in headers {:?}",
                table.headers
            )));
        }

        let mut records = Vec::with_capacity(table.rows.len());
        let mut dropped_rows = 0;
        for row in 0..table.rows.len() {
            match parse_row(table, row, &columns) {
                Some(record) if record.is_usable() => records.push(record),
                _ => dropped_rows += 1,
            }
        }
        if dropped_rows > 0 {
            debug!("丢弃 {} 行无法解析的数据", dropped_rows);
        }

        // newest first
        records.sort_by(|a, b| b.date.cmp(&a.date));

        let cutoff = today - Duration::days(self.window_days);
        let total = records.len();
        let fresh: Vec<CanonicalRecord> = records.iter().filter(|r| r.date >= cutoff).cloned().collect();

        let (mut selected, degraded) = if fresh.is_empty() && total > 0 {
            let latest = records[0].date;
            warn!(
                "数据过旧 (最新: {})，超出 {} 天范围，回退为最新 {} 条",
                latest, self.window_days, self.stale_rows
            );
            records.truncate(self.stale_rows);
            let note = format!(
                "stale source: latest {} outside {}-day window, kept newest {} rows",
                latest,
                self.window_days,
                records.len()
            );
            (records, Some(note))
        } else {
            (fresh, None)
        };

        if order == SortOrder::Ascending {
            selected.reverse();
        }

        Ok(Normalized {
            records: selected,
            degraded,
            dropped_rows,
        })
    }
}

fn parse_row(table: &RawTable, row: usize, columns: &ColumnMap) -> Option<CanonicalRecord> {
    let cell = |field: CanonicalField| columns.get(field).and_then(|c| table.cell(row, c));
    let number = |field: CanonicalField| cell(field).and_then(parse::parse_number);

    let date = cell(CanonicalField::Date).and_then(parse::parse_date)?;
    Some(CanonicalRecord {
        date,
        open: number(CanonicalField::Open),
        high: number(CanonicalField::High),
        low: number(CanonicalField::Low),
        close: number(CanonicalField::Close),
        volume: cell(CanonicalField::Volume).and_then(parse::parse_volume),
        value: number(CanonicalField::Value),
        change_pct: number(CanonicalField::ChangePct),
    })
}

/// 从页面的多个表格中选出第一个可解析的表格
pub fn pick_table<'a>(tables: &'a [RawTable], hint: Option<&str>) -> Option<&'a RawTable> {
    if let Some(hint) = hint {
        let hinted = tables
            .iter()
            .find(|t| t.name.as_deref() == Some(hint) && resolve_columns(&t.headers).is_usable());
        if hinted.is_some() {
            return hinted;
        }
    }
    tables.iter().find(|t| resolve_columns(&t.headers).is_usable())
}
