use std::collections::HashMap;

/// 规范字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Date,
    Close,
    Value,
    Open,
    High,
    Low,
    Volume,
    ChangePct,
}

impl CanonicalField {
    /// Resolution order; earlier fields claim ambiguous columns first.
    pub const ALL: [CanonicalField; 8] = [
        CanonicalField::Date,
        CanonicalField::Close,
        CanonicalField::Value,
        CanonicalField::Open,
        CanonicalField::High,
        CanonicalField::Low,
        CanonicalField::Volume,
        CanonicalField::ChangePct,
    ];

    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::Date => &["日期", "Date", "信用交易日期", "Release Date", "TRADE_DATE", "时间"],
            CanonicalField::Close => &["收盘", "Close", "Price", "收盘价", "最新价", "Last", "最新"],
            CanonicalField::Value => &["Actual", "实际值", "value", "最新值", "收益率", "Yield", "净流入"],
            CanonicalField::Open => &["开盘", "Open", "开盘价"],
            CanonicalField::High => &["高", "High", "最高", "最高价"],
            CanonicalField::Low => &["低", "Low", "最低", "最低价"],
            CanonicalField::Volume => &["交易量", "Vol.", "Volume", "成交量", "Vol"],
            CanonicalField::ChangePct => &["涨跌幅", "Change %", "Chg %", "Change%"],
        }
    }
}

/// 表头清洗：去空白、换行并转小写
pub fn clean_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Header index per resolved canonical field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: HashMap<CanonicalField, usize>,
}

impl ColumnMap {
    pub fn get(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// A table needs a date column plus close or value to be usable.
    pub fn is_usable(&self) -> bool {
        self.get(CanonicalField::Date).is_some()
            && (self.get(CanonicalField::Close).is_some() || self.get(CanonicalField::Value).is_some())
    }

    fn claims(&self, index: usize) -> bool {
        self.columns.values().any(|&i| i == index)
    }
}

/// 先精确匹配同义词，再对未匹配字段做子串匹配；每列最多归属一个字段
pub fn resolve_columns(headers: &[String]) -> ColumnMap {
    let cleaned: Vec<String> = headers.iter().map(|h| clean_header(h)).collect();
    let mut map = ColumnMap::default();

    for field in CanonicalField::ALL {
        let synonyms: Vec<String> = field.synonyms().iter().map(|s| clean_header(s)).collect();
        let found = cleaned
            .iter()
            .enumerate()
            .find(|(i, h)| !map.claims(*i) && synonyms.iter().any(|s| s == *h));
        if let Some((index, _)) = found {
            map.columns.insert(field, index);
        }
    }

    for field in CanonicalField::ALL {
        if map.get(field).is_some() {
            continue;
        }
        let found = (0..cleaned.len()).find(|&i| {
            !cleaned[i].is_empty()
                && !map.claims(i)
                && field.synonyms().iter().any(|s| partial_match(&headers[i], &cleaned[i], s))
        });
        if let Some(index) = found {
            map.columns.insert(field, index);
        }
    }

    map
}

/// Latin synonyms must match whole words ("Date" is not found in "Update");
/// CJK synonyms match anywhere in the cleaned header.
fn partial_match(header: &str, cleaned: &str, synonym: &str) -> bool {
    if synonym.is_ascii() {
        let needle = words(synonym);
        !needle.is_empty() && words(header).windows(needle.len()).any(|w| w == needle.as_slice())
    } else {
        cleaned.contains(clean_header(synonym).as_str())
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '%'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}
