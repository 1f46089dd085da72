pub mod historical;
pub mod hourly;
pub mod weekday;

pub use historical::{
    build_series, chart_statistics, default_axis_interval, format_chart_label, item_medians,
    points_from_records,
};
pub use hourly::{
    dynamic_revenue_interval, histogram_statistics, hour_label, HourlyAggregator, HourlyMetric,
};
pub use weekday::{
    aggregate_by_weekday, box_plot_stats, record_value, summarize_weekly, to_daily_tiles,
};
