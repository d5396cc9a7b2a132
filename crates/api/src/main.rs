//! Predictive Maintenance Dashboard - Main Entry Point

use anyhow::Context;
use api::{init_logging, install_metrics, run_server, AppContext, DashboardConfig};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DashboardConfig::load().context("loading dashboard configuration")?;
    init_logging(&config)?;

    info!("=== Predictive Maintenance Dashboard v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Loading model from {}", config.model_path.display());

    let ctx = match AppContext::from_config(&config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("{}", e);
            return Err(e).context("model must be available before serving predictions");
        }
    };

    let ctx = match install_metrics() {
        Ok(handle) => ctx.with_metrics(handle),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            ctx
        }
    };

    info!(
        "Model expects {} columns: {}",
        ctx.engine.schema().len(),
        ctx.engine.schema().columns().join(", ")
    );

    run_server(Arc::new(ctx), &config.bind_addr).await?;

    Ok(())
}
