//! Connection setup shared by producers and consumers

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::Result;
use futures::StreamExt;
use serverqueue::protocol::{Frame, Role, WireCodec};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info};

// Ids are unique across producers and consumers in one process
static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(0);

/// An open, greeted connection to one broker endpoint
#[derive(Debug)]
pub struct Connection {
    id: u64,
    role: Role,
    host: String,
    port: u16,
    pub(crate) framed: Framed<TcpStream, WireCodec>,
}

impl Connection {
    /// Connect to the endpoint in `config` and check that it serves `role`.
    pub async fn open(config: &ClientConfig, role: Role) -> Result<Self> {
        let address = config.address();
        debug!("Connecting {} to {}", role, address);

        let stream = timeout(config.connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| ClientError::timeout(millis(config.connect_timeout)))?
            .map_err(|e| {
                ClientError::connection(format!("Failed to connect to {}: {}", address, e))
            })?;
        stream.set_nodelay(true)?;

        let mut framed = Framed::new(stream, WireCodec::new());

        // The broker speaks first
        let hello = timeout(config.connect_timeout, framed.next())
            .await
            .map_err(|_| ClientError::timeout(millis(config.connect_timeout)))?;
        match hello {
            Some(Ok(Frame::Hello { role: served })) if served == role => {}
            Some(Ok(Frame::Hello { role: served })) => {
                return Err(ClientError::protocol(format!(
                    "{} is a {} endpoint, expected {}",
                    address, served, role
                )))
            }
            Some(Ok(other)) => {
                return Err(ClientError::protocol(format!(
                    "Expected Hello from broker, got {}",
                    other.name()
                )))
            }
            Some(Err(e)) => return Err(e.into()),
            None => {
                return Err(ClientError::connection(format!(
                    "{} closed the connection before greeting",
                    address
                )))
            }
        }

        let connection = Self {
            id: NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed),
            role,
            host: config.host.clone(),
            port: config.port,
            framed,
        };
        info!("{} connected", connection);
        Ok(connection)
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.role {
            Role::Producer => "Producer",
            Role::Consumer => "Consumer",
        };
        write!(
            f,
            "{} [id: {}, hostname: {}, port: {}]",
            label, self.id, self.host, self.port
        )
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

pub(crate) fn ack_timeout_error(duration: Duration) -> ClientError {
    ClientError::timeout(millis(duration))
}
