use clap::Parser;
use serverqueue::{BrokerConfig, BrokerServer, Result};
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "serverqueue")]
#[command(about = "Bounded producer/consumer queue shared over TCP")]
struct Args {
    /// Address both listeners bind to
    #[arg(long)]
    host: Option<String>,

    /// Port producers connect to (default 50000)
    #[arg(long)]
    producer_port: Option<u16>,

    /// Port consumers connect to (default 50001)
    #[arg(long)]
    consumer_port: Option<u16>,

    /// Maximum number of queued items (default 5)
    #[arg(short, long)]
    capacity: Option<usize>,

    /// Seconds between metrics reports, 0 to disable (default 60)
    #[arg(long)]
    metrics_interval: Option<u64>,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Command-line values take precedence over the environment
    fn apply(self, mut config: BrokerConfig) -> BrokerConfig {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.producer_port {
            config.producer_port = port;
        }
        if let Some(port) = self.consumer_port {
            config.consumer_port = port;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(secs) = self.metrics_interval {
            config.metrics_interval_secs = secs;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = parse_log_level(&args.log_level);
    tracing_subscriber::fmt()
        .with_max_level(level.unwrap_or(tracing::Level::INFO))
        .init();
    if level.is_none() {
        warn!("Invalid log level '{}', defaulting to 'info'", args.log_level);
    }

    let config = load_config(args)?;

    info!("Starting ServerQueue broker");
    info!("Producer endpoint: {}", config.producer_addr());
    info!("Consumer endpoint: {}", config.consumer_addr());
    info!("Queue capacity: {}", config.capacity);

    let server = BrokerServer::new(config)?;
    let running = server.start().await?;

    let wait = running.wait();
    tokio::pin!(wait);

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            server.shutdown();
            wait.await?;
        }
        result = &mut wait => {
            info!("Both listeners stopped");
            result?;
        }
    }

    info!("ServerQueue shut down");
    Ok(())
}

/// Environment first, then command-line overrides, validated once at the end
fn load_config(args: Args) -> Result<BrokerConfig> {
    let config = args.apply(BrokerConfig::from_env()?);
    config.validate()?;
    Ok(config)
}

fn parse_log_level(level: &str) -> Option<tracing::Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(tracing::Level::TRACE),
        "debug" => Some(tracing::Level::DEBUG),
        "info" => Some(tracing::Level::INFO),
        "warn" => Some(tracing::Level::WARN),
        "error" => Some(tracing::Level::ERROR),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_invalid_env_value() {
        std::env::set_var("SERVERQUEUE_CAPACITY", "0");

        let args = Args::try_parse_from(["serverqueue", "--capacity", "7"]).unwrap();
        let config = load_config(args).unwrap();
        assert_eq!(config.capacity, 7);

        let args = Args::try_parse_from(["serverqueue"]).unwrap();
        assert!(load_config(args).is_err());

        std::env::remove_var("SERVERQUEUE_CAPACITY");
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG"), Some(tracing::Level::DEBUG));
        assert_eq!(parse_log_level("loud"), None);
    }
}
