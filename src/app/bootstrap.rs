use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::analytics::aggregate::{
    build_series, chart_statistics, format_chart_label, histogram_statistics,
};
use crate::analytics::cache::{DailyCache, KvStore, MemoryKvStore, RedisKvStore};
use crate::analytics::services::{AnalysisService, DashboardService, LiveHourlyService};
use crate::analytics::store::{DocumentStore, MemoryDocumentStore};
use crate::app::cli::{Cli, Command};
use crate::app_config::env::CacheBackend;
use crate::app_config::AppConfig;
use crate::time_util::{Clock, PeriodGranularity, SystemClock};

/// 运行所需的依赖
pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
    pub cache: DailyCache,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let kv: Arc<dyn KvStore> = match config.cache_backend {
            CacheBackend::Memory => Arc::new(MemoryKvStore::new()),
            CacheBackend::Redis => Arc::new(RedisKvStore::connect(&config.redis_host)?),
        };
        let cache = DailyCache::with_prefix(kv, clock.clone(), &config.cache_prefix);
        Ok(Self {
            config,
            store,
            cache,
            clock,
        })
    }

    /// 从快照文件加载数据；`--data` 优先于 SNAPSHOT_PATH
    pub fn from_snapshot(config: AppConfig, data: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = data
            .or_else(|| config.snapshot_path.clone().map(PathBuf::from))
            .ok_or_else(|| anyhow!("no snapshot given: pass --data or set SNAPSHOT_PATH"))?;
        let store = MemoryDocumentStore::load_snapshot_file(&path)?;
        Self::new(config, Arc::new(store), Arc::new(SystemClock))
    }

    fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.store.clone(), self.cache.clone(), self.clock.clone())
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 执行一条命令，结果写到 stdout
pub async fn run_command(ctx: &AppContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Analyse { days, item } => {
            let days = days.unwrap_or(ctx.config.analysis_days);
            let service = AnalysisService::new(ctx.store.clone(), ctx.clock.clone());
            let data = service.fetch_analysis_data(days, item.as_deref()).await;
            print_json(&data)
        }
        Command::Items { days } => {
            let days = days.unwrap_or(ctx.config.analysis_days);
            let service = AnalysisService::new(ctx.store.clone(), ctx.clock.clone());
            let data = service.fetch_analysis_data(days, None).await;
            print_json(&data.item_names)
        }
        Command::History {
            period,
            placeholder,
            live,
        } => {
            let dashboard = ctx.dashboard();
            let points = dashboard.history(period, ctx.config.history_count).await;
            let live_total = match live {
                Some(total) => Some(total),
                None => current_total(&dashboard, period).await,
            };
            let placeholder = placeholder.unwrap_or(ctx.config.history_placeholder);
            let build = build_series(&points, live_total, placeholder, period, ctx.clock.now());
            let statistics = chart_statistics(&build.series, ctx.config.history_axis_interval(period));
            let labels: Vec<String> = build
                .series
                .iter()
                .map(|p| format_chart_label(&p.date, period))
                .collect();
            print_json(&json!({
                "period": period,
                "labels": labels,
                "build": build,
                "statistics": statistics,
            }))
        }
        Command::Hourly { metric } => {
            let service = LiveHourlyService::new(ctx.store.clone(), ctx.clock.clone());
            let snapshot = service.load_snapshot().await.unwrap_or_else(|e| {
                warn!("hourly snapshot unavailable: {}", e);
                Default::default()
            });
            let scale = histogram_statistics(&snapshot.buckets, metric, ctx.config.hourly_axis_interval);
            print_json(&json!({
                "metric": metric,
                "snapshot": snapshot,
                "axis": scale,
            }))
        }
        Command::Dashboard => {
            let overview = ctx.dashboard().overview(ctx.config.history_count).await;
            print_json(&overview)
        }
        Command::ClearCache => {
            ctx.cache.invalidate_all().await;
            info!("cache cleared with prefix {}", ctx.config.cache_prefix);
            Ok(())
        }
    }
}

/// 当前周期文档的营业额，没有数据时为 None
async fn current_total(dashboard: &DashboardService, period: PeriodGranularity) -> Option<f64> {
    let snapshots = dashboard.current_snapshots().await;
    let snapshot = match period {
        PeriodGranularity::Daily => snapshots.daily,
        PeriodGranularity::Monthly => snapshots.monthly,
        PeriodGranularity::Yearly => snapshots.yearly,
    };
    (snapshot.total > 0.0).then_some(snapshot.total)
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let ctx = AppContext::from_snapshot(config, cli.data)?;
    run_command(&ctx, cli.command).await
}
