use serde::{Deserialize, Serialize};

/// 历史图表中的一个数据点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSeriesPoint {
    /// 周期键：YYYY-MM-DD / YYYY-MM / YYYY
    pub date: String,
    pub total: f64,
    #[serde(default)]
    pub is_current: bool,
}

impl HistoricalSeriesPoint {
    pub fn new(date: impl Into<String>, total: f64) -> Self {
        Self {
            date: date.into(),
            total,
            is_current: false,
        }
    }
}

/// 历史序列构建结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesBuild {
    pub series: Vec<HistoricalSeriesPoint>,
    /// 当前周期有实际值（传入了实时值，或历史中已有大于 0 的当前周期点）
    pub current_period_exists: bool,
    /// 是否传入了实时值
    pub has_live_current_value: bool,
}

/// 历史图表统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartStatistics {
    pub max_axis_value: f64,
    pub axis_ticks: Vec<f64>,
    /// 只统计非当前周期的点
    pub median_value: f64,
    pub data_max_value: f64,
}
