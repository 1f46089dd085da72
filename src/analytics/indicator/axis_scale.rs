use serde::{Deserialize, Serialize};
use tracing::warn;

/// 坐标轴刻度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisScale {
    pub max_axis_value: f64,
    pub axis_ticks: Vec<f64>,
}

/// 计算 y 轴最大值与刻度
///
/// 最大值取不小于 max_value 的最小 interval 倍数，且至少为一个 interval；刻度从 0 开始
pub fn axis_scale(max_value: f64, interval: f64) -> AxisScale {
    let interval = if interval.is_finite() && interval > 0.0 {
        interval
    } else {
        warn!("invalid axis interval {}, fallback to 1", interval);
        1.0
    };

    let max_axis_value = interval.max((max_value / interval).ceil() * interval);
    let steps = (max_axis_value / interval).round() as usize;
    let axis_ticks = (0..=steps).map(|step| step as f64 * interval).collect();

    AxisScale {
        max_axis_value,
        axis_ticks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_up_to_interval() {
        let scale = axis_scale(250000.0, 100000.0);
        assert_eq!(scale.max_axis_value, 300000.0);
        assert_eq!(scale.axis_ticks, vec![0.0, 100000.0, 200000.0, 300000.0]);
    }

    #[test]
    fn test_floor_is_one_interval() {
        let scale = axis_scale(0.0, 15.0);
        assert_eq!(scale.max_axis_value, 15.0);
        assert_eq!(scale.axis_ticks, vec![0.0, 15.0]);
    }

    #[test]
    fn test_exact_multiple_and_bad_interval() {
        assert_eq!(axis_scale(30.0, 15.0).max_axis_value, 30.0);
        assert_eq!(axis_scale(2.5, 0.0).max_axis_value, 3.0);
    }
}
