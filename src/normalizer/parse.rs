//! Locale-tolerant cell parsers: dates, numbers, percentages and suffixed volumes.

use chrono::NaiveDate;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y年%m月%d日",
    "%b %d, %Y",
    "%B %d, %Y",
    "%m/%d/%Y",
    "%d.%m.%Y",
];

/// 去掉括号内的注释，例如 `Jan 02, 2024 (Dec)` 中的参考期
pub fn strip_parenthetical(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for c in raw.chars() {
        match c {
            '(' | '（' => depth += 1,
            ')' | '）' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// YYYYMMDD 整数形式的日期
pub fn int_to_naive_date(date_int: i32) -> Option<NaiveDate> {
    let year = date_int / 10_000;
    let month = (date_int / 100 % 100) as u32;
    let day = (date_int % 100) as u32;
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = strip_parenthetical(raw);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    if cleaned.len() == 8 && cleaned.chars().all(|c| c.is_ascii_digit()) {
        return cleaned.parse::<i32>().ok().and_then(int_to_naive_date);
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
            return Some(date);
        }
    }

    // ISO timestamps: 2024-01-02T00:00:00 / 2024-01-02 15:00:00
    cleaned
        .get(..10)
        .filter(|_| cleaned.len() > 10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// 去掉千分位和百分号后解析；无法解析时返回 None
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '，' | '%' | ' ' | '\u{a0}'))
        .map(|c| if c == '−' { '-' } else { c })
        .collect();
    if cleaned.is_empty() || cleaned == "-" || cleaned == "--" {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 成交量：K/M/B 后缀按倍数换算，`-` 或空值视为 0
pub fn parse_volume(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed == "--" {
        return Some(0.0);
    }

    let upper = trimmed.to_uppercase().replace(',', "");
    let (digits, multiplier) = match upper.chars().last() {
        Some('K') => (&upper[..upper.len() - 1], 1e3),
        Some('M') => (&upper[..upper.len() - 1], 1e6),
        Some('B') => (&upper[..upper.len() - 1], 1e9),
        _ => (upper.as_str(), 1.0),
    };

    digits
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| (v * multiplier).round())
}
