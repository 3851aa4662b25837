//! `interceptor-proxy` binary.
//!
//! Loads configuration, applies command-line overrides, and serves until
//! SIGINT or SIGTERM.

use std::path::PathBuf;

use clap::Parser;

use interceptor_proxy::config::{read_config, ConfigError, ProxyConfig};
use interceptor_proxy::lifecycle::{build_server, wait_for_signal};
use interceptor_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "interceptor-proxy")]
#[command(about = "Intercepting HTTP/1.1 proxy", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. ":8080" or "127.0.0.1:8080"
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    /// Close connections after interception instead of forwarding
    #[arg(long)]
    no_forward: bool,
}

impl Cli {
    /// File (or defaults) with flags applied. Validated by `build_server`.
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if self.no_forward {
            config.forwarding.enabled = false;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("interceptor-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let metrics_address = config
        .observability
        .metrics_enabled
        .then(|| config.observability.metrics_address.clone());

    let mut server = build_server(config)?;

    if let Some(address) = metrics_address {
        match address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(metrics_address = %address, "Failed to parse metrics address"),
        }
    }

    server.init();
    let handle = server.serve().await?;

    wait_for_signal().await;
    handle.stop().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from(["interceptor-proxy", "--listen", "127.0.0.1:3128", "--no-forward"]).unwrap();
        let config = cli.into_config().unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:3128");
        assert!(!config.forwarding.enabled);
    }

    #[test]
    fn invalid_override_rejected_by_build_server() {
        let cli = Cli::try_parse_from(["interceptor-proxy", "--listen", "no-port"]).unwrap();
        let config = cli.into_config().unwrap();
        assert!(matches!(build_server(config), Err(ConfigError::Validation(_))));
    }
}
