//! Exchange Core Server
//!
//! Boots the trading platform and the account ledger, seeds the default
//! markets from CSV, and reports metrics until Ctrl+C.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use exchange_core::{
    accounting::Accounts, config::ServerConfig, metrics::MetricsReporter, seeds, TradingPlatform,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting exchange core...");

    if let Some(addr) = config.metrics_addr {
        start_metrics_exporter(addr)?;
    }

    let platform = Arc::new(TradingPlatform::new());
    let accounts = Arc::new(Accounts::new());

    if config.no_seed {
        info!("Seeding disabled, starting with no markets");
    } else {
        let files = seeds::default_seed_files(&config.seed_dir);
        let seeder = Arc::clone(&platform);
        let seeded =
            tokio::task::spawn_blocking(move || seeds::seed_all(&seeder, &files)).await?;

        match seeded {
            Ok(rows) => info!("Seeded {} rows across {} markets", rows, platform.market_count()),
            Err(e) => {
                error!("Failed to seed markets: {}", e);
                return Err(e.into());
            }
        }
    }

    let reporter = MetricsReporter::new(Arc::clone(&platform), config.report_interval());
    reporter.report();
    tokio::spawn(async move {
        reporter.run().await;
    });

    info!(
        "Exchange core is running with {} markets and {} accounts. Press Ctrl+C to stop.",
        platform.market_count(),
        accounts.len()
    );

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down exchange core...");

    for pair in platform.markets() {
        let stats = platform.get_order_book(&pair)?.lock().stats();
        info!(
            "Final stats for {}: {} orders, {} bid levels, {} ask levels",
            pair, stats.total_orders, stats.bid_levels, stats.ask_levels
        );
    }

    Ok(())
}

/// Install the Prometheus exporter with its own HTTP listener
fn start_metrics_exporter(addr: std::net::SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new().with_http_listener(addr).install()?;

    info!("Prometheus metrics available at http://{}/metrics", addr);
    Ok(())
}
