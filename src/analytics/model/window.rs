use serde::{Deserialize, Serialize};

use super::transaction::NormalizedLineItem;
use crate::analytics::indicator::QuartileStats;

/// 每日卡片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTile {
    pub date: String,
    pub day_of_week: String,
    pub display_date: String,
    /// 选中商品时为该商品数量，否则为营业额
    pub total: f64,
    /// 原始营业额，不受筛选影响
    pub original_total: f64,
    pub customer_number: u64,
    pub items: Vec<NormalizedLineItem>,
    pub voucher_count: u32,
}

/// 参与中位数计算的单日数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationPoint {
    pub date: String,
    pub display_date: String,
    pub total: f64,
}

/// 按星期分组的中位数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyMedianBucket {
    pub day_name: String,
    pub median: f64,
    /// 按日期从旧到新
    pub calculation_data: Vec<CalculationPoint>,
}

impl WeeklyMedianBucket {
    pub fn totals(&self) -> Vec<f64> {
        self.calculation_data.iter().map(|p| p.total).collect()
    }
}

/// 单个星期的箱线图数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBoxPlot {
    pub day_name: String,
    pub values: Vec<f64>,
    /// 星期桶自身的中位数（最近 8 个）
    pub median: f64,
    /// 全量数据的四分位统计
    pub stats: QuartileStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub total_data_points: usize,
    pub days_with_data: usize,
}
