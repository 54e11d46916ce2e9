//! Consumer client for receiving items from the broker's queue

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::Result;
use futures::StreamExt;
use serverqueue::protocol::{Frame, Role};
use serverqueue::Item;
use std::fmt;

/// Receives the items the broker pushes to the consumer endpoint
#[derive(Debug)]
pub struct Consumer {
    connection: Connection,
}

impl Consumer {
    /// Connect to a consumer endpoint
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let connection = Connection::open(&config, Role::Consumer).await?;
        Ok(Self { connection })
    }

    pub fn id(&self) -> u64 {
        self.connection.id()
    }

    /// Wait for the next item.
    ///
    /// Returns `Ok(None)` once the broker closes the connection.
    pub async fn recv(&mut self) -> Result<Option<Item>> {
        match self.connection.framed.next().await {
            Some(Ok(Frame::Item(item))) => Ok(Some(item)),
            Some(Ok(other)) => Err(ClientError::protocol(format!(
                "Expected Item, got {}",
                other.name()
            ))),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}

impl fmt::Display for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.connection, f)
    }
}
