use serde::{Deserialize, Serialize};

use super::median::middle_of_sorted;

/// 箱线图统计值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuartileStats {
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    /// 非离群值中的最小值
    pub min: f64,
    /// 非离群值中的最大值
    pub max: f64,
    pub outliers: Vec<f64>,
}

impl QuartileStats {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// 离群值判定区间 [q1 - 1.5·iqr, q3 + 1.5·iqr]
    pub fn bounds(&self) -> (f64, f64) {
        let iqr = self.iqr();
        (self.q1 - 1.5 * iqr, self.q3 + 1.5 * iqr)
    }
}

/// 计算四分位数与离群值
///
/// 使用全部数据（没有 8 个的窗口限制）；q1/q3 直接取下标 floor(n/4)、floor(3n/4)，不插值。
pub fn quartiles(values: &[f64]) -> QuartileStats {
    if values.is_empty() {
        return QuartileStats::default();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();

    let median = middle_of_sorted(&sorted);
    let q1 = sorted[n / 4];
    let q3 = sorted[(3 * n) / 4];
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    let (inliers, outliers): (Vec<f64>, Vec<f64>) = sorted
        .iter()
        .copied()
        .partition(|v| *v >= lower && *v <= upper);

    let (min, max) = match (inliers.first(), inliers.last()) {
        (Some(min), Some(max)) => (*min, *max),
        _ => (sorted[0], sorted[n - 1]),
    };

    QuartileStats {
        median,
        q1,
        q3,
        min,
        max,
        outliers,
    }
}
