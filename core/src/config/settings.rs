use super::BrokerConfig;
use crate::{Result, ServerQueueError};
use config::{Config, Environment};

impl BrokerConfig {
    /// Defaults overlaid with `SERVERQUEUE_*` environment variables,
    /// e.g. `SERVERQUEUE_CAPACITY=10`.
    ///
    /// Not validated here: command-line overrides are layered on top first.
    pub fn from_env() -> Result<Self> {
        let settings = Config::builder()
            .add_source(Environment::with_prefix("SERVERQUEUE").try_parsing(true))
            .build()
            .map_err(|e| ServerQueueError::Config(e.to_string()))?;

        settings
            .try_deserialize::<BrokerConfig>()
            .map_err(|e| ServerQueueError::Config(e.to_string()))
    }
}
