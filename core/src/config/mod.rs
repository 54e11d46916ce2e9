pub mod settings;

use crate::{Result, ServerQueueError};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

/// Default port producers connect to
pub const DEFAULT_PRODUCER_PORT: u16 = 50000;
/// Default port consumers connect to
pub const DEFAULT_CONSUMER_PORT: u16 = 50001;
/// Default number of items the broker buffers
pub const DEFAULT_CAPACITY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub producer_port: u16,
    pub consumer_port: u16,
    pub capacity: usize,
    /// Seconds between metrics reports; 0 disables reporting
    pub metrics_interval_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            producer_port: DEFAULT_PRODUCER_PORT,
            consumer_port: DEFAULT_CONSUMER_PORT,
            capacity: DEFAULT_CAPACITY,
            metrics_interval_secs: 60,
        }
    }
}

impl BrokerConfig {
    /// Loopback config on ephemeral ports, for tests and embedding
    pub fn ephemeral(capacity: usize) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            producer_port: 0,
            consumer_port: 0,
            capacity,
            metrics_interval_secs: 0,
        }
    }

    pub fn producer_addr(&self) -> String {
        format!("{}:{}", self.host, self.producer_port)
    }

    pub fn consumer_addr(&self) -> String {
        format!("{}:{}", self.host, self.consumer_port)
    }

    /// Validate bounds before any listener or queue is created
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ServerQueueError::Config("capacity must be > 0".to_string()));
        }
        if self.capacity > Semaphore::MAX_PERMITS {
            return Err(ServerQueueError::Config(format!(
                "capacity must be <= {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.producer_port != 0 && self.producer_port == self.consumer_port {
            return Err(ServerQueueError::Config(format!(
                "producer and consumer ports must differ (both {})",
                self.producer_port
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = BrokerConfig::default();
        assert_eq!(config.producer_port, 50000);
        assert_eq!(config.consumer_port, 50001);
        assert_eq!(config.capacity, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero = BrokerConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(ServerQueueError::Config(_))));

        let same_port = BrokerConfig {
            producer_port: 6000,
            consumer_port: 6000,
            ..Default::default()
        };
        assert!(same_port.validate().is_err());

        assert!(BrokerConfig::ephemeral(1).validate().is_ok());
    }

    #[test]
    fn test_addresses() {
        let config = BrokerConfig {
            host: "localhost".to_string(),
            ..Default::default()
        };
        assert_eq!(config.producer_addr(), "localhost:50000");
        assert_eq!(config.consumer_addr(), "localhost:50001");
    }
}
