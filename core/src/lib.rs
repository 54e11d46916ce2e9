//! # ServerQueue Core Library
//!
//! ServerQueue is a network-accessible bounded buffer: independent producer
//! processes push items into a shared, capacity-limited FIFO queue hosted by
//! a broker, and independent consumer processes pull items from it over a
//! second TCP endpoint.
//!
//! ## Architecture Overview
//!
//! - [`item`] - the unit of transfer, identified by a random UUID
//! - [`queue`] - fixed-capacity FIFO with blocking `put`/`take`
//! - [`protocol`] - versioned wire frames and the `tokio_util` codec
//! - [`broker`] - the two listeners and the per-connection handlers
//! - [`config`] - startup configuration (defaults, environment, CLI)
//! - [`metrics`] - lock-free counters reported periodically through `tracing`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serverqueue::{BrokerConfig, BrokerServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BrokerConfig {
//!         producer_port: 50000,
//!         consumer_port: 50001,
//!         capacity: 5,
//!         ..Default::default()
//!     };
//!
//!     let server = BrokerServer::new(config)?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Backpressure
//!
//! The queue is the only synchronization point between producers and
//! consumers. A producer connection only receives its acknowledgement once
//! its item has been inserted, so a full queue stalls producers until a
//! consumer connection takes an item out.

pub mod broker;
pub mod config;
pub mod item;
pub mod metrics;
pub mod protocol;
pub mod queue;

pub use broker::{BrokerServer, ConnectionHandler, ConsumerHandler, ProducerHandler, RunningBroker};
pub use config::BrokerConfig;
pub use item::Item;
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use protocol::{Frame, Role, WireCodec};
pub use queue::BoundedQueue;

use thiserror::Error;

/// ServerQueue error types
///
/// # Error Categories
///
/// - **ConnectionIo**: socket read/write failures, local to one handler
/// - **Protocol**: malformed or unexpected frames, local to one handler
/// - **Interrupted**: cooperative cancellation of a blocked wait
/// - **ListenerBind**: a listening endpoint could not be opened
/// - **Config**: invalid startup configuration
///
/// # Example
///
/// ```rust,no_run
/// use serverqueue::{Result, ServerQueueError};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(()) => println!("Success"),
///         Err(ServerQueueError::Interrupted) => println!("Shutting down"),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum ServerQueueError {
    /// Socket read or write failure
    #[error("Connection I/O error: {0}")]
    ConnectionIo(#[from] std::io::Error),

    /// Malformed payload or a frame not allowed in the current state
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A blocked `put`, `take` or accept was cancelled
    #[error("Operation interrupted")]
    Interrupted,

    /// Failure to open a listening endpoint
    #[error("Failed to bind {role} listener on {addr}: {source}")]
    ListenerBind {
        role: Role,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration validation and parsing errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServerQueueError {
    /// Create a protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol(message.into())
    }

    /// True for failures that only affect the connection they occurred on
    pub fn is_connection_local(&self) -> bool {
        matches!(self, Self::ConnectionIo(_) | Self::Protocol(_))
    }
}

/// Result type alias for ServerQueue operations
pub type Result<T> = std::result::Result<T, ServerQueueError>;
