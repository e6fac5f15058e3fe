use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the trading server.
#[derive(Parser, Debug, Clone)]
#[command(name = "trading_server", version, about = "In-memory multi-market exchange core")]
pub struct ServerConfig {
    /// Directory holding the per-market seed CSV files
    #[arg(long, env = "EXCHANGE_SEED_DIR", default_value = "data")]
    pub seed_dir: PathBuf,

    /// Start with empty books instead of loading seed data
    #[arg(long, env = "EXCHANGE_NO_SEED")]
    pub no_seed: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "EXCHANGE_LOG", default_value = "info")]
    pub log_filter: String,

    /// Seconds between metrics log lines
    #[arg(long, env = "EXCHANGE_REPORT_INTERVAL", default_value_t = 10)]
    pub report_interval_secs: u64,

    /// Address for the Prometheus exporter; disabled when absent
    #[arg(long, env = "EXCHANGE_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

impl ServerConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs.max(1))
    }
}
