pub mod analysis_service;
pub mod dashboard_service;
pub mod live_hourly_service;

pub use analysis_service::{AnalysisData, AnalysisService, DEFAULT_ANALYSIS_DAYS};
pub use dashboard_service::{
    period_median, CurrentSnapshots, DailyHistory, DashboardOverview,
    DashboardService, DEFAULT_HISTORY_COUNT,
};
pub use live_hourly_service::{LiveHourlyHandle, LiveHourlyService, LiveHourlySnapshot};
