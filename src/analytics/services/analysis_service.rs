use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::analytics::aggregate::{
    aggregate_by_weekday, box_plot_stats, summarize_weekly, to_daily_tiles,
};
use crate::analytics::model::{
    DailyTile, DayBoxPlot, RawTransactionRecord, WeeklyMedianBucket, WeeklySummary,
};
use crate::analytics::normalizer::extract_unique_item_names;
use crate::analytics::store::{fetch_by_keys_batched, DocumentStore, DAILY_COLLECTION};
use crate::time_util::{Clock, DateRange};

pub const DEFAULT_ANALYSIS_DAYS: u32 = 14;

/// 分析页数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    pub date_range: DateRange,
    pub metric_selector: Option<String>,
    /// 新到旧
    pub daily_tiles: Vec<DailyTile>,
    pub weekly_medians: Vec<WeeklyMedianBucket>,
    pub box_plots: Vec<DayBoxPlot>,
    pub summary: WeeklySummary,
    pub item_names: Vec<String>,
}

pub struct AnalysisService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl AnalysisService {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 读取日期范围内的日交易记录，按日期新到旧排列
    pub async fn fetch_transactions(
        &self,
        range: &DateRange,
    ) -> anyhow::Result<Vec<RawTransactionRecord>> {
        let keys = range.day_keys();
        let docs = fetch_by_keys_batched(self.store.as_ref(), DAILY_COLLECTION, &keys).await?;
        let mut records = RawTransactionRecord::from_documents(&docs);
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    /// 最近 `days` 天（含今天）的卡片、星期中位数与箱线图
    ///
    /// 读取失败时返回空卡片和 7 个空桶
    pub async fn fetch_analysis_data(&self, days: u32, metric_selector: Option<&str>) -> AnalysisData {
        let date_range = DateRange::last_n_days(self.clock.now(), days);
        let records = match self.fetch_transactions(&date_range).await {
            Ok(records) => {
                info!(
                    "fetched {} daily transactions for {} days",
                    records.len(),
                    days
                );
                records
            }
            Err(e) => {
                error!("fetch analysis data error: {}", e);
                Vec::new()
            }
        };

        let weekly_medians = aggregate_by_weekday(&records, metric_selector).to_vec();
        AnalysisData {
            date_range,
            metric_selector: metric_selector.map(str::to_string),
            daily_tiles: to_daily_tiles(&records, metric_selector),
            box_plots: box_plot_stats(&weekly_medians),
            summary: summarize_weekly(&weekly_medians),
            item_names: extract_unique_item_names(&records),
            weekly_medians,
        }
    }
}
