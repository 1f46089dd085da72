use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analytics::aggregate::historical::{
    DEFAULT_HISTORY_AXIS_INTERVAL, DEFAULT_MONTHLY_AXIS_INTERVAL, DEFAULT_PLACEHOLDER,
    DEFAULT_YEARLY_AXIS_INTERVAL,
};
use crate::analytics::aggregate::hourly::DEFAULT_HOURLY_AXIS_INTERVAL;
use crate::analytics::cache::DEFAULT_CACHE_PREFIX;
use crate::analytics::services::{DEFAULT_ANALYSIS_DAYS, DEFAULT_HISTORY_COUNT};
use crate::app_config::redis::DEFAULT_REDIS_HOST;
use crate::error::AppError;
use crate::time_util::PeriodGranularity;

/// 读取字符串环境变量，若不存在则返回默认值
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// 读取数值环境变量，无法解析时记录告警并使用默认值
fn env_parse<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => match v.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("invalid {}={}, fallback to {}", key, v, default);
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_i64(key: &str, default: i64) -> i64 {
    env_parse(key, default)
}

pub fn env_f64(key: &str, default: f64) -> f64 {
    env_parse(key, default)
}

/// 缓存后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl FromStr for CacheBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            other => Err(AppError::Config(format!("unknown CACHE_BACKEND: {}", other))),
        }
    }
}

/// 运行配置，全部来自环境变量（.env）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub redis_host: String,
    pub cache_backend: CacheBackend,
    pub cache_prefix: String,
    pub snapshot_path: Option<String>,
    pub analysis_days: u32,
    pub history_placeholder: f64,
    pub daily_axis_interval: f64,
    pub monthly_axis_interval: f64,
    pub yearly_axis_interval: f64,
    pub hourly_axis_interval: f64,
    pub history_count: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let cache_backend = env_or_default("CACHE_BACKEND", "memory").parse::<CacheBackend>()?;
        let analysis_days = analysis_days_from(env_i64("ANALYSIS_DAYS", DEFAULT_ANALYSIS_DAYS as i64))?;
        let history_count = env_i64("HISTORY_COUNT", DEFAULT_HISTORY_COUNT as i64).max(1);

        Ok(Self {
            app_env: env_or_default("APP_ENV", "LOCAL"),
            redis_host: env_or_default("REDIS_HOST", DEFAULT_REDIS_HOST),
            cache_backend,
            cache_prefix: env_or_default("CACHE_PREFIX", DEFAULT_CACHE_PREFIX),
            snapshot_path: env::var("SNAPSHOT_PATH").ok().filter(|p| !p.trim().is_empty()),
            analysis_days,
            history_placeholder: env_f64("HISTORY_PLACEHOLDER", DEFAULT_PLACEHOLDER),
            daily_axis_interval: env_f64("DAILY_AXIS_INTERVAL", DEFAULT_HISTORY_AXIS_INTERVAL),
            monthly_axis_interval: env_f64("MONTHLY_AXIS_INTERVAL", DEFAULT_MONTHLY_AXIS_INTERVAL),
            yearly_axis_interval: env_f64("YEARLY_AXIS_INTERVAL", DEFAULT_YEARLY_AXIS_INTERVAL),
            hourly_axis_interval: env_f64("HOURLY_AXIS_INTERVAL", DEFAULT_HOURLY_AXIS_INTERVAL),
            history_count: history_count as usize,
        })
    }

    pub fn is_local(&self) -> bool {
        self.app_env == "LOCAL"
    }

    pub fn history_axis_interval(&self, granularity: PeriodGranularity) -> f64 {
        match granularity {
            PeriodGranularity::Daily => self.daily_axis_interval,
            PeriodGranularity::Monthly => self.monthly_axis_interval,
            PeriodGranularity::Yearly => self.yearly_axis_interval,
        }
    }
}

/// ANALYSIS_DAYS 必须是 u32 范围内的正数
fn analysis_days_from(raw: i64) -> Result<u32, AppError> {
    if raw <= 0 {
        return Err(AppError::Config(format!("ANALYSIS_DAYS must be positive: {}", raw)));
    }
    u32::try_from(raw).map_err(|_| AppError::Config(format!("ANALYSIS_DAYS too large: {}", raw)))
}
