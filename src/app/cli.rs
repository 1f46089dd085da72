use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::analytics::aggregate::HourlyMetric;
use crate::time_util::PeriodGranularity;

/// 零售看板分析，结果以 JSON 输出到 stdout
#[derive(Debug, Parser)]
#[command(name = "retail_pulse", version, about)]
pub struct Cli {
    /// 数据快照 JSON（默认读取 SNAPSHOT_PATH）
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 最近 N 天的每日卡片、星期中位数和箱线图
    Analyse {
        #[arg(long)]
        days: Option<u32>,
        /// 按商品数量统计，而不是营业额
        #[arg(long)]
        item: Option<String>,
    },
    /// 日/月/年历史序列与图表统计
    History {
        #[arg(long, value_enum, default_value_t = PeriodGranularity::Daily)]
        period: PeriodGranularity,
        #[arg(long)]
        placeholder: Option<f64>,
        /// 当前周期的实时值，不传时取当前周期文档的营业额
        #[arg(long)]
        live: Option<f64>,
    },
    /// 今日小时柱状图
    Hourly {
        #[arg(long, value_enum, default_value_t = HourlyMetric::Items)]
        metric: HourlyMetric,
    },
    /// 最近 N 天出现过的商品名
    Items {
        #[arg(long)]
        days: Option<u32>,
    },
    /// 首页汇总
    Dashboard,
    /// 清空当日缓存
    ClearCache,
}
