//! 雅加达时间（UTC+7）工具
//!
//! 所有日历键、当日起点、当前小时、次日零点都从这里计算，
//! 其他模块不再自行处理时区偏移。

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// UTC+7，单位秒
pub const JAKARTA_OFFSET_SECS: i32 = 7 * 3600;

pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub const DAY_ABBREVIATIONS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// 统计周期粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PeriodGranularity {
    Daily,
    Monthly,
    Yearly,
}

/// 时钟抽象，便于测试注入固定时间
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定时钟，可手动推进
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

pub fn jakarta_offset() -> FixedOffset {
    FixedOffset::east_opt(JAKARTA_OFFSET_SECS).expect("UTC+7 is within the valid offset range")
}

/// 转换为雅加达本地时间
pub fn to_jakarta(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    now.with_timezone(&jakarta_offset())
}

/// 雅加达当天日期
pub fn jakarta_today(now: DateTime<Utc>) -> NaiveDate {
    to_jakarta(now).date_naive()
}

/// 雅加达当前小时 (0-23)
pub fn jakarta_hour(now: DateTime<Utc>) -> u32 {
    to_jakarta(now).hour()
}

/// 雅加达当天 00:00:00 对应的 UTC 时刻
pub fn jakarta_start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    let local = to_jakarta(now);
    now - Duration::seconds(local.num_seconds_from_midnight() as i64)
        - Duration::nanoseconds(local.nanosecond() as i64)
}

/// 下一个雅加达零点，缓存过期时间统一取这个值
pub fn next_jakarta_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    jakarta_start_of_day(now) + Duration::days(1)
}

/// YYYY-MM-DD
pub fn day_key(now: DateTime<Utc>) -> String {
    format_day_key(jakarta_today(now))
}

/// YYYY-MM
pub fn month_key(now: DateTime<Utc>) -> String {
    to_jakarta(now).format("%Y-%m").to_string()
}

/// YYYY
pub fn year_key(now: DateTime<Utc>) -> String {
    to_jakarta(now).format("%Y").to_string()
}

/// 按粒度取"当前周期"的键
pub fn period_key(now: DateTime<Utc>, granularity: PeriodGranularity) -> String {
    match granularity {
        PeriodGranularity::Daily => day_key(now),
        PeriodGranularity::Monthly => month_key(now),
        PeriodGranularity::Yearly => year_key(now),
    }
}

pub fn format_day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// 星期序号，周日为 0
pub fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_sunday() as usize
}

pub fn weekday_name(date: NaiveDate) -> &'static str {
    DAY_NAMES[weekday_index(date)]
}

pub fn weekday_abbreviation(date: NaiveDate) -> &'static str {
    DAY_ABBREVIATIONS[weekday_index(date)]
}

/// 展示日期 d/m/yyyy
pub fn display_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// 从 reference 起每次后退 7 天，生成 3×count 个同星期日期键
///
/// 数据可能缺失，调用方逐个读取直到凑满需要的条数
pub fn same_weekday_dates_before(reference: NaiveDate, count: usize) -> Vec<String> {
    let mut dates = Vec::with_capacity(count * 3);
    let mut current = reference;
    for _ in 0..count * 3 {
        match current.checked_sub_signed(Duration::days(7)) {
            Some(previous) => current = previous,
            None => break,
        }
        dates.push(format_day_key(current));
    }
    dates
}

/// 查询的日期范围（包含首尾）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    /// 截至雅加达今天的最近 days 天
    ///
    /// days 为 0 或超出日期可表示范围时返回空范围
    pub fn last_n_days(now: DateTime<Utc>, days: u32) -> Self {
        let end_date = jakarta_today(now);
        let start_date = match days {
            0 => None,
            n => end_date.checked_sub_signed(Duration::days(i64::from(n) - 1)),
        };
        match start_date {
            Some(start_date) => Self {
                start_date,
                end_date,
            },
            None => {
                if days > 0 {
                    warn!("{} days before {} is out of range", days, end_date);
                }
                Self::empty(end_date)
            }
        }
    }

    /// 起点为终点次日的空范围
    fn empty(end_date: NaiveDate) -> Self {
        Self {
            start_date: end_date.succ_opt().unwrap_or(NaiveDate::MAX),
            end_date,
        }
    }

    /// 范围内每天的日期键，起点晚于终点时为空
    pub fn day_keys(&self) -> Vec<String> {
        date_keys_between(self.start_date, self.end_date)
    }
}

pub fn date_keys_between(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(format_day_key)
        .collect()
}

/// 解析旧版字符串时间戳，如 "Timestamp(seconds=1747895272, nanoseconds=317000000)"
pub fn parse_timestamp_string(raw: &str) -> Option<DateTime<Utc>> {
    let start = raw.find("seconds=")? + "seconds=".len();
    let digits: String = raw[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    match digits.parse::<i64>() {
        Ok(seconds) => DateTime::from_timestamp(seconds, 0),
        Err(e) => {
            warn!("parse timestamp string error: {} raw:{}", e, raw);
            None
        }
    }
}

/// 解析文档中的时间戳字段
///
/// 支持 `{seconds, nanoseconds}` 对象、毫秒整数、RFC 3339 字符串以及旧版字符串格式
pub fn parse_store_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, nanos as u32).single()
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| parse_timestamp_string(s)),
        _ => None,
    }
}

/// 两个时刻相差的分钟数（四舍五入）
pub fn time_diff_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let diff_ms = (end - start).num_milliseconds();
    (diff_ms as f64 / 60_000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_keys_use_jakarta_calendar() {
        // UTC 2023-12-31 18:00 已是雅加达 2024-01-01 01:00
        let now = utc("2023-12-31T18:00:00Z");
        assert_eq!(day_key(now), "2024-01-01");
        assert_eq!(month_key(now), "2024-01");
        assert_eq!(year_key(now), "2024");
        assert_eq!(jakarta_hour(now), 1);
    }

    #[test]
    fn test_start_of_day_and_next_midnight() {
        let now = utc("2024-03-04T03:15:30Z");
        assert_eq!(jakarta_start_of_day(now), utc("2024-03-03T17:00:00Z"));
        assert_eq!(next_jakarta_midnight(now), utc("2024-03-04T17:00:00Z"));

        // 刚过零点
        let just_after = utc("2024-03-04T17:00:01Z");
        assert_eq!(next_jakarta_midnight(just_after), utc("2024-03-05T17:00:00Z"));
    }

    #[test]
    fn test_same_weekday_dates_before() {
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let dates = same_weekday_dates_before(monday, 4);
        assert_eq!(dates.len(), 12);
        assert_eq!(dates[0], "2024-02-26");
        assert_eq!(dates[1], "2024-02-19");
        for key in &dates {
            assert_eq!(weekday_index(parse_day_key(key).unwrap()), 1);
        }
        assert!(dates.windows(2).all(|w| w[0] > w[1]));
        // 每次调用都重新计算
        assert_eq!(dates, same_weekday_dates_before(monday, 4));
    }

    #[test]
    fn test_date_range_keys() {
        let range = DateRange::last_n_days(utc("2024-03-04T03:00:00Z"), 3);
        assert_eq!(range.day_keys(), vec!["2024-03-02", "2024-03-03", "2024-03-04"]);
        let empty = DateRange::last_n_days(utc("2024-03-04T03:00:00Z"), 0);
        assert!(empty.day_keys().is_empty());
    }

    #[test]
    fn test_date_range_beyond_calendar_is_empty() {
        let range = DateRange::last_n_days(utc("2024-03-04T03:00:00Z"), u32::MAX);
        assert_eq!(range.end_date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert!(range.start_date > range.end_date);
        assert!(range.day_keys().is_empty());
    }

    #[test]
    fn test_parse_timestamps() {
        let parsed =
            parse_timestamp_string("Timestamp(seconds=1747895272, nanoseconds=317000000)").unwrap();
        assert_eq!(parsed.timestamp(), 1747895272);
        assert!(parse_timestamp_string("garbage").is_none());

        let obj = json!({"seconds": 1709521200, "nanoseconds": 0});
        assert_eq!(parse_store_timestamp(&obj), Some(utc("2024-03-04T03:00:00Z")));
        let millis = json!(1709521200000i64);
        assert_eq!(parse_store_timestamp(&millis), Some(utc("2024-03-04T03:00:00Z")));
        let rfc = json!("2024-03-04T10:00:00+07:00");
        assert_eq!(parse_store_timestamp(&rfc), Some(utc("2024-03-04T03:00:00Z")));
        assert!(parse_store_timestamp(&json!(null)).is_none());
    }

    #[test]
    fn test_time_diff_minutes() {
        let start = utc("2024-03-04T03:00:00Z");
        let end = utc("2024-03-04T03:12:40Z");
        assert_eq!(time_diff_minutes(start, end), 13);
    }

    #[test]
    fn test_display_helpers() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(display_date(date), "1/1/2024");
        assert_eq!(weekday_abbreviation(date), "Mon");
        assert_eq!(weekday_name(date), "Monday");
    }
}
