//! 日/月/年历史序列

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::analytics::indicator::{axis_scale, median};
use crate::analytics::model::lenient::value_as_number;
use crate::analytics::model::{
    ChartStatistics, HistoricalSeriesPoint, RawTransactionRecord, SeriesBuild,
};
use crate::analytics::store::Document;
use crate::time_util::{parse_day_key, period_key, PeriodGranularity};

/// 当前周期没有数据时使用的默认占位值
pub const DEFAULT_PLACEHOLDER: f64 = 100000.0;
pub const DEFAULT_HISTORY_AXIS_INTERVAL: f64 = 100000.0;
pub const DEFAULT_MONTHLY_AXIS_INTERVAL: f64 = 2_500_000.0;
pub const DEFAULT_YEARLY_AXIS_INTERVAL: f64 = 50_000_000.0;

/// 各粒度默认的坐标轴间隔
pub fn default_axis_interval(granularity: PeriodGranularity) -> f64 {
    match granularity {
        PeriodGranularity::Daily => DEFAULT_HISTORY_AXIS_INTERVAL,
        PeriodGranularity::Monthly => DEFAULT_MONTHLY_AXIS_INTERVAL,
        PeriodGranularity::Yearly => DEFAULT_YEARLY_AXIS_INTERVAL,
    }
}

/// 构建带"当前周期"点的历史序列
///
/// - 传入实时值：在当前周期键上写入（覆盖已有值）
/// - 没有实时值且缺少当前周期点：用占位值补一个点
/// - 已有当前周期点：保持原值
///
/// 最后重新排序，并按键重新标记 `is_current`。
pub fn build_series(
    points: &[HistoricalSeriesPoint],
    live_total: Option<f64>,
    placeholder: f64,
    granularity: PeriodGranularity,
    now: DateTime<Utc>,
) -> SeriesBuild {
    let mut series = points.to_vec();
    series.sort_by(|a, b| a.date.cmp(&b.date));

    let now_key = period_key(now, granularity);
    let existing = series.iter().position(|p| p.date == now_key);
    let existing_has_value = existing
        .map(|index| series[index].total > 0.0)
        .unwrap_or(false);

    match (live_total, existing) {
        (Some(total), Some(index)) => series[index].total = total,
        (Some(total), None) => series.push(HistoricalSeriesPoint::new(now_key.clone(), total)),
        (None, None) => series.push(HistoricalSeriesPoint::new(now_key.clone(), placeholder)),
        (None, Some(_)) => {}
    }

    series.sort_by(|a, b| a.date.cmp(&b.date));
    for point in series.iter_mut() {
        point.is_current = point.date == now_key;
    }

    SeriesBuild {
        series,
        current_period_exists: live_total.is_some() || existing_has_value,
        has_live_current_value: live_total.is_some(),
    }
}

/// 中位数只统计非当前周期；坐标轴覆盖全部点
pub fn chart_statistics(series: &[HistoricalSeriesPoint], interval: f64) -> ChartStatistics {
    let historical: Vec<f64> = series
        .iter()
        .filter(|p| !p.is_current)
        .map(|p| p.total)
        .collect();
    let data_max_value = series.iter().map(|p| p.total).fold(0.0, f64::max);
    let scale = axis_scale(data_max_value, interval);

    ChartStatistics {
        max_axis_value: scale.max_axis_value,
        axis_ticks: scale.axis_ticks,
        median_value: median(&historical),
        data_max_value,
    }
}

/// 图表横轴标签："Jan 5" / "Jan 2024" / "2024"，无法解析时原样返回
pub fn format_chart_label(key: &str, granularity: PeriodGranularity) -> String {
    let label = match granularity {
        PeriodGranularity::Daily => parse_day_key(key).map(|d| d.format("%b %-d").to_string()),
        PeriodGranularity::Monthly => NaiveDate::parse_from_str(&format!("{}-01", key), "%Y-%m-%d")
            .ok()
            .map(|d| d.format("%b %Y").to_string()),
        PeriodGranularity::Yearly => None,
    };
    label.unwrap_or_else(|| key.to_string())
}

pub fn points_from_records(records: &[RawTransactionRecord]) -> Vec<HistoricalSeriesPoint> {
    records
        .iter()
        .map(|record| HistoricalSeriesPoint::new(record.date.clone(), record.total))
        .collect()
}

/// 每个商品的历史中位数
///
/// `docs` 按新到旧排列；只统计 `items` 下的数值，顶层字段不参与
pub fn item_medians(docs: &[Document], item_keys: &[String]) -> BTreeMap<String, f64> {
    let oldest_first: Vec<&Document> = docs.iter().rev().collect();
    item_keys
        .iter()
        .map(|key| {
            let quantities: Vec<f64> = oldest_first
                .iter()
                .filter_map(|doc| {
                    doc.data
                        .get("items")
                        .and_then(|items| items.get(key))
                        .and_then(value_as_number)
                })
                .collect();
            (key.clone(), median(&quantities))
        })
        .collect()
}
