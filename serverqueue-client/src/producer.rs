//! Producer client for putting items into the broker's queue

use crate::config::ClientConfig;
use crate::connection::{ack_timeout_error, Connection};
use crate::error::ClientError;
use crate::Result;
use futures::{SinkExt, StreamExt};
use serverqueue::protocol::{Frame, Role};
use serverqueue::Item;
use std::fmt;
use tokio::time::timeout;
use tracing::debug;

/// Sends items to the producer endpoint, one acknowledged item at a time
#[derive(Debug)]
pub struct Producer {
    connection: Connection,
    config: ClientConfig,
    // Set once an exchange fails; a late Ack would otherwise be read as
    // the reply to the next item
    failed: bool,
}

impl Producer {
    /// Connect to a producer endpoint
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let connection = Connection::open(&config, Role::Producer).await?;
        Ok(Self {
            connection,
            config,
            failed: false,
        })
    }

    pub fn id(&self) -> u64 {
        self.connection.id()
    }

    /// Send one item and wait until the broker has queued it.
    ///
    /// While the broker's queue is full this does not return, unless
    /// `ack_timeout` is configured. After any error, including a timeout,
    /// the producer is unusable and every later call fails.
    pub async fn send(&mut self, item: Item) -> Result<()> {
        if self.failed {
            return Err(ClientError::connection(format!(
                "{} is unusable after a failed send",
                self
            )));
        }

        let result = self.exchange(item).await;
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    async fn exchange(&mut self, item: Item) -> Result<()> {
        self.connection.framed.send(Frame::Item(item)).await?;

        let reply = match self.config.ack_timeout {
            Some(limit) => timeout(limit, self.connection.framed.next())
                .await
                .map_err(|_| ack_timeout_error(limit))?,
            None => self.connection.framed.next().await,
        };

        match reply {
            Some(Ok(Frame::Ack)) => {
                debug!("{} put {}", self, item);
                Ok(())
            }
            Some(Ok(other)) => Err(ClientError::protocol(format!(
                "Expected Ack, got {}",
                other.name()
            ))),
            Some(Err(e)) => Err(e.into()),
            None => Err(ClientError::connection(
                "Broker closed the connection before acknowledging",
            )),
        }
    }

    /// Create a fresh item, send it, and return it once acknowledged
    pub async fn produce(&mut self) -> Result<Item> {
        let item = Item::new();
        self.send(item).await?;
        Ok(item)
    }
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.connection, f)
    }
}
