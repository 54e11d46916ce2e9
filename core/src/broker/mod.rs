//! # ServerQueue Broker Module
//!
//! The broker owns the single shared [`BoundedQueue`](crate::BoundedQueue)
//! and connects any number of network peers to it.
//!
//! ## Architecture
//!
//! - [`server`] - binds the producer and consumer listeners and runs one
//!   accept loop per listener; every accepted socket gets its own task
//! - [`handler`] - the per-connection protocol loops, one variant per role,
//!   behind the [`ConnectionHandler`] trait
//! - [`shutdown`] - the cancellation signal shared by listeners and handlers
//!
//! ## Fault isolation
//!
//! I/O and protocol failures end only the connection they happen on. A
//! listener that fails takes down its own accept loop; the other listener
//! and every running handler keep going.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use serverqueue::{BrokerConfig, BrokerServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = BrokerServer::new(BrokerConfig::default())?;
//!     let running = server.start().await?;
//!
//!     println!("producers: {:?}", running.producer_addr());
//!     println!("consumers: {:?}", running.consumer_addr());
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown();
//!     running.wait().await?;
//!     Ok(())
//! }
//! ```

pub mod handler;
pub mod server;
pub mod shutdown;

pub use handler::*;
pub use server::*;
pub use shutdown::Shutdown;
