//! Network Telemetry Binary

use clap::Parser;
use network_telemetry::{
    Config, HttpTransport, InstrumentedProber, Network, Orchestrator, RefreshTrigger, Result,
    SystemClock,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Interval for logging probe metrics while running.
const METRICS_LOG_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser, Debug)]
#[command(name = "network-telemetry", version, about = "Storage network health and upload telemetry")]
struct Cli {
    /// Network to monitor (mainnet or testnet)
    #[arg(long, env = "NETWORK")]
    network: Option<Network>,

    /// Run a single refresh cycle, print the snapshot as JSON and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing();

    let cli = Cli::parse();

    info!("Starting network telemetry v{}", env!("CARGO_PKG_VERSION"));

    let config = match cli.network {
        Some(network) => {
            let mut config = Config::for_network(network);
            config.apply_env();
            config
        }
        None => Config::from_env(),
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if config.storage_api_key.is_none() && config.profile.has_storage() {
        info!("STORAGE_API_KEY not set, storage probes and upload series will be unavailable");
    }

    info!(
        "Telemetry configuration - Network: {}, Explorer: {}, Refresh interval: {}s",
        config.profile.display_name,
        config.profile.explorer_api,
        config.refresh_interval.as_secs()
    );

    let transport = HttpTransport::new(&config)?;
    let prober = Arc::new(InstrumentedProber::new(transport.clone()));
    let transport = Arc::new(transport);

    let orchestrator = Arc::new(Orchestrator::new(
        config,
        prober.clone(),
        transport.clone(),
        transport,
        Arc::new(SystemClock),
    ));

    if cli.once {
        let Some(snapshot) = orchestrator.refresh(RefreshTrigger::Manual).await else {
            error!("Refresh did not run");
            std::process::exit(1);
        };
        println!("{}", snapshot.to_json()?);
        return Ok(());
    }

    let metrics_task = {
        let prober = Arc::clone(&prober);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(METRICS_LOG_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let metrics = prober.metrics().await;
                info!(
                    "Probe metrics - Attempts: {}, Success rate: {:.1}%, Avg: {}ms",
                    metrics.attempts, metrics.success_rate, metrics.avg_duration_ms
                );
            }
        })
    };

    // Keep the handle alive so the manual channel stays open.
    let (_handle, manual) = orchestrator.refresh_handle();
    orchestrator
        .run(manual, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;

    metrics_task.abort();
    info!("Network telemetry stopped");

    Ok(())
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
