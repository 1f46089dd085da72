//! 按星期聚合：中位数、每日卡片、箱线图

use tracing::warn;

use crate::analytics::indicator::{median, quartiles};
use crate::analytics::model::{
    CalculationPoint, DailyTile, DayBoxPlot, RawTransactionRecord, WeeklyMedianBucket,
    WeeklySummary,
};
use crate::analytics::normalizer::{item_quantity, normalize, voucher_count};
use crate::time_util::{
    display_date, parse_day_key, weekday_abbreviation, weekday_index, DAY_NAMES,
};

/// 记录的取值：未选商品时为营业额，否则为该商品数量
pub fn record_value(record: &RawTransactionRecord, metric_selector: Option<&str>) -> f64 {
    match metric_selector {
        Some(name) => item_quantity(record, name),
        None => record.total,
    }
}

/// 按星期分组求中位数，固定返回周日到周六 7 个桶
///
/// 取值 <= 0 的记录不进入桶；每个桶先按日期从旧到新排序，再取最近 8 个求中位数
pub fn aggregate_by_weekday(
    records: &[RawTransactionRecord],
    metric_selector: Option<&str>,
) -> [WeeklyMedianBucket; 7] {
    let mut populations: [Vec<CalculationPoint>; 7] = Default::default();

    for record in records {
        let value = record_value(record, metric_selector);
        if value <= 0.0 {
            continue;
        }
        let Some(date) = parse_day_key(&record.date) else {
            warn!("skip record with invalid date key: {}", record.date);
            continue;
        };
        populations[weekday_index(date)].push(CalculationPoint {
            date: record.date.clone(),
            display_date: display_date(date),
            total: value,
        });
    }

    std::array::from_fn(|index| {
        let mut calculation_data = std::mem::take(&mut populations[index]);
        // YYYY-MM-DD 字典序即时间序
        calculation_data.sort_by(|a, b| a.date.cmp(&b.date));
        let totals: Vec<f64> = calculation_data.iter().map(|p| p.total).collect();
        WeeklyMedianBucket {
            day_name: DAY_NAMES[index].to_string(),
            median: median(&totals),
            calculation_data,
        }
    })
}

/// 每条记录一张卡片，保持输入顺序
pub fn to_daily_tiles(
    records: &[RawTransactionRecord],
    metric_selector: Option<&str>,
) -> Vec<DailyTile> {
    records
        .iter()
        .map(|record| {
            let items = normalize(record);
            let date = parse_day_key(&record.date);
            DailyTile {
                date: record.date.clone(),
                day_of_week: date.map(weekday_abbreviation).unwrap_or_default().to_string(),
                display_date: date.map(display_date).unwrap_or_default(),
                total: record_value(record, metric_selector),
                original_total: record.total,
                customer_number: record.customer_number,
                voucher_count: voucher_count(&items),
                items,
            }
        })
        .collect()
}

/// 箱线图统计：四分位基于桶内全部数据，不做 8 个的截取
pub fn box_plot_stats(buckets: &[WeeklyMedianBucket]) -> Vec<DayBoxPlot> {
    buckets
        .iter()
        .map(|bucket| {
            let values = bucket.totals();
            DayBoxPlot {
                day_name: bucket.day_name.clone(),
                stats: quartiles(&values),
                median: bucket.median,
                values,
            }
        })
        .collect()
}

pub fn summarize_weekly(buckets: &[WeeklyMedianBucket]) -> WeeklySummary {
    WeeklySummary {
        total_data_points: buckets.iter().map(|b| b.calculation_data.len()).sum(),
        days_with_data: buckets
            .iter()
            .filter(|b| !b.calculation_data.is_empty())
            .count(),
    }
}
