//! 首页数据：当前周期快照、历史序列、商品中位数

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::analytics::aggregate::{item_medians, points_from_records};
use crate::analytics::cache::DailyCache;
use crate::analytics::indicator::median;
use crate::analytics::model::{HistoricalSeriesPoint, PeriodSnapshot, RawTransactionRecord};
use crate::analytics::normalizer::normalize;
use crate::analytics::store::{
    fetch_one, DocumentStore, SortDirection, DAILY_COLLECTION, DOCUMENT_ID_FIELD,
    MONTHLY_COLLECTION, YEARLY_COLLECTION,
};
use crate::time_util::{
    day_key, jakarta_today, month_key, same_weekday_dates_before, weekday_name, year_key, Clock,
    PeriodGranularity,
};

pub const DEFAULT_HISTORY_COUNT: usize = 12;
/// 同星期历史：最多收集的天数
const WEEKDAY_HISTORY_TARGET: usize = 8;
/// 同星期历史：候选日期数量基数（实际生成 3 倍）
const WEEKDAY_HISTORY_LOOKBACK: usize = 24;
const MONTHLY_HISTORY_CACHE_KEY: &str = "monthly-historical-data";
const YEARLY_HISTORY_CACHE_KEY: &str = "yearly-historical-data";
const TIMESTAMP_FIELD: &str = "timestamp";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSnapshots {
    pub daily: PeriodSnapshot,
    pub monthly: PeriodSnapshot,
    pub yearly: PeriodSnapshot,
}

/// 与今天同星期的历史
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyHistory {
    pub weekday: String,
    pub median: Option<f64>,
    /// 新到旧
    pub points: Vec<HistoricalSeriesPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub snapshots: CurrentSnapshots,
    pub daily_history: DailyHistory,
    pub monthly_history: Vec<HistoricalSeriesPoint>,
    pub monthly_median: Option<f64>,
    pub yearly_history: Vec<HistoricalSeriesPoint>,
    pub yearly_median: Option<f64>,
    pub daily_item_medians: BTreeMap<String, f64>,
    pub monthly_item_medians: BTreeMap<String, f64>,
    pub yearly_item_medians: BTreeMap<String, f64>,
}

/// 历史序列中位数，空序列为 None
pub fn period_median(points: &[HistoricalSeriesPoint]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    let totals: Vec<f64> = points.iter().map(|p| p.total).collect();
    Some(median(&totals))
}

fn snapshot_of(key: String, record: Option<RawTransactionRecord>) -> PeriodSnapshot {
    match record {
        Some(record) => PeriodSnapshot {
            key,
            total: record.total,
            customer_number: record.customer_number,
            items: normalize(&record),
            item_keys: record.items.keys().cloned().collect(),
        },
        None => PeriodSnapshot {
            key,
            ..Default::default()
        },
    }
}

pub struct DashboardService {
    store: Arc<dyn DocumentStore>,
    cache: DailyCache,
    clock: Arc<dyn Clock>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: DailyCache, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            cache,
            clock,
        }
    }

    async fn fetch_record(&self, collection: &str, key: &str) -> anyhow::Result<Option<RawTransactionRecord>> {
        let doc = fetch_one(self.store.as_ref(), collection, key).await?;
        Ok(doc.as_ref().map(RawTransactionRecord::from_document))
    }

    /// 今天、本月、今年的汇总，缺失时为 0
    pub async fn current_snapshots(&self) -> CurrentSnapshots {
        let now = self.clock.now();
        let (day, month, year) = (day_key(now), month_key(now), year_key(now));
        let fetched = futures::try_join!(
            self.fetch_record(DAILY_COLLECTION, &day),
            self.fetch_record(MONTHLY_COLLECTION, &month),
            self.fetch_record(YEARLY_COLLECTION, &year),
        );
        match fetched {
            Ok((daily, monthly, yearly)) => CurrentSnapshots {
                daily: snapshot_of(day, daily),
                monthly: snapshot_of(month, monthly),
                yearly: snapshot_of(year, yearly),
            },
            Err(e) => {
                error!("fetch current snapshots error: {}", e);
                CurrentSnapshots {
                    daily: snapshot_of(day, None),
                    monthly: snapshot_of(month, None),
                    yearly: snapshot_of(year, None),
                }
            }
        }
    }

    /// 与今天同星期的最近 8 天营业额（大于 0 的才计入）
    pub async fn daily_weekday_history(&self) -> DailyHistory {
        let today = jakarta_today(self.clock.now());
        let weekday = weekday_name(today).to_string();
        let median_key = format!("daily-historical-data-{}", weekday);
        let points_key = format!("historical-daily-{}", weekday);

        if let (Some(totals), Some(points)) = (
            self.cache.get::<Vec<f64>>(&median_key).await,
            self.cache.get::<Vec<HistoricalSeriesPoint>>(&points_key).await,
        ) {
            debug!("using cached daily history for {}", weekday);
            return DailyHistory {
                weekday,
                median: (!totals.is_empty()).then(|| median(&totals)),
                points,
            };
        }

        match self.harvest_weekday_history(today).await {
            Ok(points) => {
                let totals: Vec<f64> = points.iter().map(|p| p.total).collect();
                if !totals.is_empty() {
                    self.cache.set(&median_key, &totals).await;
                    self.cache.set(&points_key, &points).await;
                } else {
                    info!("no previous data found for {}", weekday);
                }
                DailyHistory {
                    weekday,
                    median: (!totals.is_empty()).then(|| median(&totals)),
                    points,
                }
            }
            Err(e) => {
                error!("fetch daily history error: {}", e);
                DailyHistory {
                    weekday,
                    median: None,
                    points: Vec::new(),
                }
            }
        }
    }

    async fn harvest_weekday_history(
        &self,
        today: chrono::NaiveDate,
    ) -> anyhow::Result<Vec<HistoricalSeriesPoint>> {
        let mut points = Vec::with_capacity(WEEKDAY_HISTORY_TARGET);
        for date in same_weekday_dates_before(today, WEEKDAY_HISTORY_LOOKBACK) {
            if points.len() >= WEEKDAY_HISTORY_TARGET {
                break;
            }
            let Some(record) = self.fetch_record(DAILY_COLLECTION, &date).await? else {
                continue;
            };
            if record.total > 0.0 {
                debug!("found data for {}: {}", date, record.total);
                points.push(HistoricalSeriesPoint::new(date, record.total));
            }
        }
        Ok(points)
    }

    async fn ordered_history(
        &self,
        collection: &str,
        limit: Option<usize>,
        cache_key: &str,
    ) -> Vec<HistoricalSeriesPoint> {
        if let Some(points) = self.cache.get::<Vec<HistoricalSeriesPoint>>(cache_key).await {
            debug!("using cached {}", cache_key);
            return points;
        }
        let docs = match self
            .store
            .fetch_ordered_limited(collection, TIMESTAMP_FIELD, SortDirection::Desc, limit)
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                error!("fetch {} history error: {}", collection, e);
                return Vec::new();
            }
        };
        let mut points = points_from_records(&RawTransactionRecord::from_documents(&docs));
        points.sort_by(|a, b| a.date.cmp(&b.date));
        if !points.is_empty() {
            self.cache.set(cache_key, &points).await;
        }
        points
    }

    /// 最近 `count` 个月，旧到新
    pub async fn monthly_history(&self, count: usize) -> Vec<HistoricalSeriesPoint> {
        self.ordered_history(MONTHLY_COLLECTION, Some(count), MONTHLY_HISTORY_CACHE_KEY)
            .await
    }

    /// 全部年份，旧到新
    pub async fn yearly_history(&self) -> Vec<HistoricalSeriesPoint> {
        self.ordered_history(YEARLY_COLLECTION, None, YEARLY_HISTORY_CACHE_KEY)
            .await
    }

    /// 按粒度取历史；日粒度为同星期历史（旧到新）
    pub async fn history(
        &self,
        granularity: PeriodGranularity,
        count: usize,
    ) -> Vec<HistoricalSeriesPoint> {
        match granularity {
            PeriodGranularity::Daily => {
                let mut points = self.daily_weekday_history().await.points;
                points.reverse();
                points
            }
            PeriodGranularity::Monthly => self.monthly_history(count).await,
            PeriodGranularity::Yearly => self.yearly_history().await,
        }
    }

    /// 商品历史中位数；读取失败时全部为 0
    pub async fn item_medians(
        &self,
        collection: &str,
        item_keys: &[String],
        count: usize,
    ) -> BTreeMap<String, f64> {
        if item_keys.is_empty() {
            return BTreeMap::new();
        }
        let order_field = if collection == DAILY_COLLECTION {
            DOCUMENT_ID_FIELD
        } else {
            TIMESTAMP_FIELD
        };
        match self
            .store
            .fetch_ordered_limited(collection, order_field, SortDirection::Desc, Some(count))
            .await
        {
            Ok(docs) => {
                debug!("{} item medians from {} documents", collection, docs.len());
                item_medians(&docs, item_keys)
            }
            Err(e) => {
                error!("item medians for {} error: {}", collection, e);
                item_keys.iter().map(|key| (key.clone(), 0.0)).collect()
            }
        }
    }

    /// 首页全部数据，各部分并行读取
    pub async fn overview(&self, history_count: usize) -> DashboardOverview {
        let (snapshots, daily_history, monthly_history, yearly_history) = futures::join!(
            self.current_snapshots(),
            self.daily_weekday_history(),
            self.monthly_history(history_count),
            self.yearly_history(),
        );

        let (daily_item_medians, monthly_item_medians, yearly_item_medians) = futures::join!(
            self.item_medians(DAILY_COLLECTION, &snapshots.daily.item_keys, history_count),
            self.item_medians(MONTHLY_COLLECTION, &snapshots.monthly.item_keys, history_count),
            self.item_medians(YEARLY_COLLECTION, &snapshots.yearly.item_keys, history_count),
        );

        DashboardOverview {
            monthly_median: period_median(&monthly_history),
            yearly_median: period_median(&yearly_history),
            snapshots,
            daily_history,
            monthly_history,
            yearly_history,
            daily_item_medians,
            monthly_item_medians,
            yearly_item_medians,
        }
    }
}
