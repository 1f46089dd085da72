use clap::Parser;
use dotenv::dotenv;
use tracing::error;

use retail_pulse::app::bootstrap;
use retail_pulse::app::cli::Cli;
use retail_pulse::app_config::log::setup_logging;
use retail_pulse::app_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    // 设置日志
    setup_logging(&config)?;

    if let Err(e) = bootstrap::run(cli, config).await {
        error!("run command error: {:?}", e);
        return Err(e);
    }
    Ok(())
}
