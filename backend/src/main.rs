use anyhow::Context;
use common::logger::init_tracing;
use spikewatch::{app::App, config::AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing("spikewatch", is_production);

    tracing::info!("Starting spike watch...");

    let cfg = AppConfig::from_env().context("invalid configuration")?;

    let app = App::from_config(&cfg).context("failed to assemble application")?;
    app.start_all();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    app.shutdown().await;
    Ok(())
}
