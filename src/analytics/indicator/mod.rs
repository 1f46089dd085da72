//! 统计指标：中位数、四分位数、坐标轴刻度

pub mod axis_scale;
pub mod median;
pub mod quartile;

pub use axis_scale::{axis_scale, AxisScale};
pub use median::{median, MEDIAN_WINDOW};
pub use quartile::{quartiles, QuartileStats};
