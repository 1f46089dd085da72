//! 营业时段（08:00-16:00）的小时柱状图

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::indicator::{axis_scale, AxisScale};
use crate::analytics::model::{HourlyBucket, PendingOrder, ServedOrder};
use crate::time_util::{jakarta_hour, jakarta_start_of_day};

pub const OPENING_HOUR: u32 = 8;
pub const CLOSING_HOUR: u32 = 16;
pub const DEFAULT_HOURLY_AXIS_INTERVAL: f64 = 15.0;

/// 不再计入制作中的订单状态，大小写敏感
pub const EXCLUDED_PENDING_STATUSES: [&str; 2] = ["completed", "cancelled"];

/// "8:00-9:00"
pub fn hour_label(hour: u32) -> String {
    format!("{}:00-{}:00", hour, hour + 1)
}

#[derive(Debug, Default)]
struct HourAccumulator {
    total: f64,
    pending_total: f64,
    revenue: f64,
    customers: HashSet<String>,
}

/// 单次重建用的累加器，重建结束即丢弃
#[derive(Debug)]
pub struct HourlyAggregator {
    now: DateTime<Utc>,
    day_start: DateTime<Utc>,
    hours: BTreeMap<u32, HourAccumulator>,
}

impl HourlyAggregator {
    pub fn new(now: DateTime<Utc>) -> Self {
        let hours = (OPENING_HOUR..CLOSING_HOUR)
            .map(|hour| (hour, HourAccumulator::default()))
            .collect();
        Self {
            now,
            day_start: jakarta_start_of_day(now),
            hours,
        }
    }

    /// 按出餐时间归入时段；没有出餐时间或不在营业时段内的忽略
    pub fn add_served(&mut self, order: &ServedOrder) {
        let Some(served_at) = order.served_at else {
            return;
        };
        let Some(bucket) = self.hours.get_mut(&jakarta_hour(served_at)) else {
            return;
        };
        bucket.total += order.item_quantity();
        bucket.revenue += order.total;
        if !order.customer_number.is_empty() {
            bucket.customers.insert(order.customer_number.clone());
        }
    }

    /// 按下单时间归入时段；已完成/已取消、缺少下单时间或早于今天的忽略
    pub fn add_pending(&mut self, order: &PendingOrder) {
        if EXCLUDED_PENDING_STATUSES.contains(&order.status.as_str()) {
            return;
        }
        let Some(ordered_at) = order.ordered_at else {
            return;
        };
        if ordered_at < self.day_start {
            return;
        }
        if let Some(bucket) = self.hours.get_mut(&jakarta_hour(ordered_at)) {
            bucket.pending_total += order.item_quantity();
        }
    }

    pub fn finish(self) -> Vec<HourlyBucket> {
        let current_hour = jakarta_hour(self.now);
        self.hours
            .into_iter()
            .map(|(hour, acc)| HourlyBucket {
                hour: hour_label(hour),
                start_hour: hour,
                total: acc.total,
                pending_total: acc.pending_total,
                revenue: acc.revenue,
                customer_count: acc.customers.len(),
                is_current: hour == current_hour,
            })
            .collect()
    }

    /// 从全量数据重建 8 个时段
    pub fn rebuild(
        served: &[ServedOrder],
        pending: &[PendingOrder],
        now: DateTime<Utc>,
    ) -> Vec<HourlyBucket> {
        let mut aggregator = Self::new(now);
        served.iter().for_each(|order| aggregator.add_served(order));
        pending.iter().for_each(|order| aggregator.add_pending(order));
        aggregator.finish()
    }
}

/// 柱状图展示的指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HourlyMetric {
    #[default]
    Items,
    Revenue,
    Customers,
}

impl HourlyMetric {
    /// 已出餐层与制作中层叠加后的高度
    pub fn stacked_value(self, bucket: &HourlyBucket) -> f64 {
        match self {
            HourlyMetric::Items => bucket.total + bucket.pending_total,
            HourlyMetric::Revenue => bucket.revenue + bucket.pending_total,
            HourlyMetric::Customers => {
                let pending_customer = if bucket.pending_total > 0.0 { 1.0 } else { 0.0 };
                bucket.customer_count as f64 + pending_customer
            }
        }
    }
}

/// 营业额坐标轴间隔随最大值变化
pub fn dynamic_revenue_interval(max_revenue: f64) -> f64 {
    if max_revenue < 200_000.0 {
        50_000.0
    } else if max_revenue < 500_000.0 {
        100_000.0
    } else {
        200_000.0
    }
}

/// 柱状图坐标轴；营业额使用动态间隔，`interval` 只作用于件数和顾客数
pub fn histogram_statistics(
    buckets: &[HourlyBucket],
    metric: HourlyMetric,
    interval: f64,
) -> AxisScale {
    let max = buckets
        .iter()
        .map(|bucket| metric.stacked_value(bucket))
        .fold(0.0, f64::max);
    let interval = match metric {
        HourlyMetric::Revenue => dynamic_revenue_interval(max),
        HourlyMetric::Items | HourlyMetric::Customers => interval,
    };
    axis_scale(max, interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::store::Document;
    use chrono::TimeZone;
    use serde_json::json;

    // 2024-03-04 10:30 雅加达时间
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 3, 30, 0).unwrap()
    }

    fn served(id: &str, customer: &str, utc_hour: u32, qty: f64, total: f64) -> ServedOrder {
        let ts = Utc.with_ymd_and_hms(2024, 3, 4, utc_hour, 5, 0).unwrap();
        ServedOrder::from_document(&Document::new(
            id,
            json!({
                "customerNumber": customer,
                "timestampServe": ts.timestamp_millis(),
                "total": total,
                "orderItems": [{"namaPesanan": "Teh", "quantity": qty}]
            }),
        ))
        .unwrap()
    }

    fn pending(id: &str, status: &str, ordered_at: DateTime<Utc>) -> PendingOrder {
        PendingOrder::from_document(&Document::new(
            id,
            json!({
                "status": status,
                "waktuPesan": ordered_at.timestamp_millis(),
                "orderItems": [{"namaPesanan": "Nasi", "dineInQuantity": 2, "takeAwayQuantity": 1}]
            }),
        ))
        .unwrap()
    }

    #[test]
    fn test_eight_sorted_buckets() {
        let buckets = HourlyAggregator::rebuild(&[], &[], now());
        assert_eq!(buckets.len(), 8);
        assert_eq!(buckets[0].hour, "8:00-9:00");
        assert_eq!(buckets[7].hour, "15:00-16:00");
        let current: Vec<u32> = buckets
            .iter()
            .filter(|b| b.is_current)
            .map(|b| b.start_hour)
            .collect();
        assert_eq!(current, vec![10]);
    }

    #[test]
    fn test_served_and_pending() {
        let served = vec![
            served("a", "7", 2, 2.0, 30000.0),
            served("b", "7", 2, 1.0, 15000.0),
            served("c", "9", 2, 3.0, 45000.0),
        ];
        let today = Utc.with_ymd_and_hms(2024, 3, 4, 3, 10, 0).unwrap();
        let yesterday = Utc.with_ymd_and_hms(2024, 3, 3, 3, 10, 0).unwrap();
        let pending = vec![
            pending("p1", "pending", today),
            pending("p2", "completed", today),
            pending("p3", "cancelled", today),
            pending("p4", "pending", yesterday),
        ];
        let buckets = HourlyAggregator::rebuild(&served, &pending, now());
        let nine = &buckets[1];
        assert_eq!(nine.total, 6.0);
        assert_eq!(nine.revenue, 90000.0);
        assert_eq!(nine.customer_count, 2);
        let ten = &buckets[2];
        assert_eq!(ten.pending_total, 3.0);
        assert_eq!(buckets.iter().map(|b| b.pending_total).sum::<f64>(), 3.0);
    }

    #[test]
    fn test_stacked_customers() {
        let bucket = HourlyBucket {
            hour: hour_label(9),
            start_hour: 9,
            total: 4.0,
            pending_total: 2.0,
            revenue: 10.0,
            customer_count: 3,
            is_current: false,
        };
        assert_eq!(HourlyMetric::Customers.stacked_value(&bucket), 4.0);
        assert_eq!(HourlyMetric::Items.stacked_value(&bucket), 6.0);
        assert_eq!(HourlyMetric::Revenue.stacked_value(&bucket), 12.0);
        let scale = histogram_statistics(&[bucket], HourlyMetric::Items, 15.0);
        assert_eq!(scale.max_axis_value, 15.0);
    }

    #[test]
    fn test_status_match_is_case_sensitive() {
        let today = Utc.with_ymd_and_hms(2024, 3, 4, 3, 10, 0).unwrap();
        let pending = vec![pending("p1", "Cancelled", today), pending("p2", "COMPLETED", today)];
        let buckets = HourlyAggregator::rebuild(&[], &pending, now());
        assert_eq!(buckets[2].pending_total, 6.0);
    }

    #[test]
    fn test_anonymous_served_orders_not_customers() {
        let served = vec![
            served("a", "", 2, 1.0, 10000.0),
            served("b", "", 2, 1.0, 10000.0),
            served("c", "", 2, 1.0, 10000.0),
        ];
        let buckets = HourlyAggregator::rebuild(&served, &[], now());
        assert_eq!(buckets[1].total, 3.0);
        assert_eq!(buckets[1].customer_count, 0);
    }

    #[test]
    fn test_revenue_axis_uses_dynamic_interval() {
        assert_eq!(dynamic_revenue_interval(150_000.0), 50_000.0);
        assert_eq!(dynamic_revenue_interval(200_000.0), 100_000.0);
        assert_eq!(dynamic_revenue_interval(3_000_000.0), 200_000.0);

        let bucket = HourlyBucket {
            hour: hour_label(9),
            start_hour: 9,
            total: 1.0,
            pending_total: 0.0,
            revenue: 3_000_000.0,
            customer_count: 1,
            is_current: false,
        };
        let scale = histogram_statistics(&[bucket], HourlyMetric::Revenue, 15.0);
        assert_eq!(scale.max_axis_value, 3_000_000.0);
        assert_eq!(scale.axis_ticks.len(), 16);
    }
}
