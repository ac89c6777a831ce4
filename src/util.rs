use crate::models::CanonicalRecord;
use chrono::NaiveDate;
use chrono_tz::Tz;
use log::info;

/// 保留最新的 `max_records` 条记录（输入需按日期降序）
pub fn limit_records(records: &mut Vec<CanonicalRecord>, max_records: usize, name: &str) {
    if records.len() > max_records {
        info!("{} 的 {} 条记录截断为 {} 条", name, records.len(), max_records);
        records.truncate(max_records);
    }
}

/// 四舍五入到指定小数位
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // large magnitudes overflow the scaled product
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

/// 报告生成时间戳
pub fn timestamp_in(tz: Tz) -> String {
    chrono::Utc::now().with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 指定时区下的"今天"
pub fn today_in(tz: Tz) -> NaiveDate {
    chrono::Utc::now().with_timezone(&tz).date_naive()
}
