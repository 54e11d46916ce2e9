//! Configuration types for ServerQueue clients

use serverqueue::config::{DEFAULT_CONSUMER_PORT, DEFAULT_PRODUCER_PORT};
use std::time::Duration;

/// Where and how a client connects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Broker hostname or IP
    pub host: String,
    /// Broker endpoint port; producers and consumers use different ones
    pub port: u16,
    /// Limit on TCP connect plus the broker's greeting
    pub connect_timeout: Duration,
    /// How long a producer waits for an acknowledgement. `None` waits as
    /// long as the broker keeps the queue full.
    pub ack_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::producer()
    }
}

impl ClientConfig {
    /// Defaults for the broker's producer endpoint on this machine
    pub fn producer() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PRODUCER_PORT,
            connect_timeout: Duration::from_secs(10),
            ack_timeout: None,
        }
    }

    /// Defaults for the broker's consumer endpoint on this machine
    pub fn consumer() -> Self {
        Self {
            port: DEFAULT_CONSUMER_PORT,
            ..Self::producer()
        }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = Some(timeout);
        self
    }

    /// `host:port` form accepted by `TcpStream::connect`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_use_broker_default_ports() {
        assert_eq!(ClientConfig::producer().port, 50000);
        assert_eq!(ClientConfig::consumer().port, 50001);
        assert_eq!(ClientConfig::consumer().host, "localhost");
        assert_eq!(ClientConfig::default(), ClientConfig::producer());
    }

    #[test]
    fn test_builder_methods() {
        let config = ClientConfig::consumer()
            .host("10.0.0.7")
            .port(6000)
            .ack_timeout(Duration::from_millis(500));

        assert_eq!(config.address(), "10.0.0.7:6000");
        assert_eq!(config.ack_timeout, Some(Duration::from_millis(500)));
    }
}
