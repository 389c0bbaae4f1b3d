mod api;
mod error;
mod monitor;
mod state;
#[cfg(test)]
mod test_support;

use api::{create_router, ApiState};
use log::{error, info, warn};
use monitor::BondingMonitor;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;
use token_radar_core::{
    error::CoreError,
    native::{DexScreenerClient, FileStorage, NativeHttpClient, PumpFunClient},
    QuoteSource, RequestGate, Settings, TokenPipeline, TokenSource,
};

type AppError = CoreError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    env_logger::init();
    // Unconditional so a missing or misspelled RUST_LOG doesn't look like a hang.
    println!(
        "token_radar starting (pid {}), RUST_LOG={:?}",
        std::process::id(),
        std::env::var("RUST_LOG").ok()
    );

    let config_path =
        std::env::var("TOKEN_RADAR_CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let settings = Arc::new(Settings::load(&config_path)?);
    settings.validate()?;
    info!(
        "Loaded settings from {} (threshold ${}, data_dir {})",
        config_path, settings.bonding_threshold_usd, settings.data_dir
    );

    let http = Arc::new(NativeHttpClient::new(&settings)?);
    let cooldown = Duration::from_secs(settings.breaker_cooldown_secs);
    let pump_gate = Arc::new(RequestGate::new(
        "pump.fun",
        settings.requests_per_second,
        settings.breaker_failure_threshold,
        cooldown,
    ));
    let dex_gate = Arc::new(RequestGate::new(
        "dexscreener",
        settings.requests_per_second,
        settings.breaker_failure_threshold,
        cooldown,
    ));

    let source: Arc<dyn TokenSource> =
        Arc::new(PumpFunClient::new(http.clone(), pump_gate.clone(), &settings)?);
    let quotes: Arc<dyn QuoteSource> =
        Arc::new(DexScreenerClient::new(http, dex_gate.clone(), &settings));
    let pipeline = Arc::new(TokenPipeline::new(source, quotes, &settings));

    let storage = Arc::new(FileStorage::new(PathBuf::from(&settings.data_dir)));
    let monitor = BondingMonitor::new(pipeline.clone(), storage, &settings).await?;
    if settings.monitor_autostart {
        if let Err(e) = monitor.start().await {
            warn!("Bonding monitor autostart skipped: {}", e);
        }
    }

    let api_state = ApiState {
        settings: settings.clone(),
        pipeline,
        monitor: monitor.clone(),
        gates: vec![pump_gate, dex_gate],
    };
    let router = create_router(api_state);

    let bind_addr = format!("{}:{}", settings.api_host, settings.api_port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind API server to {}: {}", bind_addr, e);
            return Err(e.into());
        }
    };
    info!("API server listening on {}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if monitor.is_running().await {
        if let Err(e) = monitor.stop().await {
            warn!("Failed to stop bonding monitor: {}", e);
        }
    }
    info!("token_radar stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
