//! 数据模型

pub mod lenient;
pub mod order;
pub mod series;
pub mod transaction;
pub mod window;

pub use order::{HourlyBucket, PendingItem, PendingOrder, ServedItem, ServedOrder};
pub use series::{ChartStatistics, HistoricalSeriesPoint, SeriesBuild};
pub use transaction::{
    ItemCategory, NormalizedLineItem, PeriodSnapshot, RawTransactionRecord, EXCLUDED_FIELDS,
};
pub use window::{CalculationPoint, DailyTile, DayBoxPlot, WeeklyMedianBucket, WeeklySummary};
