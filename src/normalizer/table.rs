use crate::errors::{RadarError, Result};
use calamine::{open_workbook_auto_from_rs, DataType, Reader};
use chrono::{Duration, NaiveDate};
use log::debug;
use std::io::Cursor;

/// 未归一化的表格：表头 + 字符串单元格
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub name: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: None,
            headers,
            rows,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Build from header→cell mappings; headers are collected in first-seen order.
    pub fn from_records<R, K, V>(records: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers: Vec<String> = Vec::new();
        let mut keyed_rows: Vec<Vec<(usize, String)>> = Vec::new();

        for record in records {
            let mut row = Vec::new();
            for (key, value) in record {
                let key = key.as_ref();
                let index = match headers.iter().position(|h| h == key) {
                    Some(i) => i,
                    None => {
                        headers.push(key.to_string());
                        headers.len() - 1
                    }
                };
                row.push((index, value.as_ref().to_string()));
            }
            keyed_rows.push(row);
        }

        let rows = keyed_rows
            .into_iter()
            .map(|cells| {
                let mut row = vec![String::new(); headers.len()];
                for (i, v) in cells {
                    row[i] = v;
                }
                row
            })
            .collect();

        Self::new(headers, rows)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(column)).map(String::as_str)
    }

    /// 读取 xlsx/xls/ods 文件中的全部工作表，首行为表头
    pub fn from_workbook_bytes(bytes: &[u8]) -> Result<Vec<RawTable>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let sheet_names = workbook.sheet_names().to_vec();

        let mut tables = Vec::new();
        for sheet in sheet_names {
            let range = workbook.worksheet_range(&sheet)?;

            let mut rows = range.rows();
            let headers: Vec<String> = match rows.next() {
                Some(header_row) => header_row.iter().map(cell_to_string).collect(),
                None => continue,
            };
            let body: Vec<Vec<String>> = rows
                .map(|row| row.iter().map(cell_to_string).collect())
                .collect();

            debug!("工作表 {} 读取到 {} 行", sheet, body.len());
            tables.push(RawTable::new(headers, body).with_name(&sheet));
        }

        if tables.is_empty() {
            return Err(RadarError::ParseError("workbook contains no worksheets".to_string()));
        }
        Ok(tables)
    }
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::DateTime(serial) => excel_serial_to_date(*serial)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        DataType::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Excel 序列日期（1900 日期系统）
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_keyed_records() {
        let table = RawTable::from_records(vec![
            vec![("Date", "Jan 02, 2024"), ("Price", "1,234.5")],
            vec![("Price", "1,200.0"), ("Date", "Jan 01, 2024"), ("Vol.", "1K")],
        ]);
        assert_eq!(table.headers, vec!["Date", "Price", "Vol."]);
        assert_eq!(table.cell(0, 2), Some(""));
        assert_eq!(table.cell(1, 0), Some("Jan 01, 2024"));
        assert_eq!(table.cell(1, 2), Some("1K"));
    }

    #[test]
    fn converts_excel_serial_dates() {
        assert_eq!(excel_serial_to_date(45293.0), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(excel_serial_to_date(0.0), None);
    }

    #[test]
    fn rejects_non_workbook_bytes() {
        assert!(RawTable::from_workbook_bytes(b"<html>not a spreadsheet</html>").is_err());
    }
}
