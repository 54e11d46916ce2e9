//! # ServerQueue Client Library
//!
//! Async producer and consumer clients for the ServerQueue broker.
//!
//! A [`Producer`] sends one item at a time and waits for the broker's
//! acknowledgement before returning, so a full broker queue slows the
//! producer down. A [`Consumer`] receives items as the broker pushes them.
//!
//! ## Quick Start
//!
//! ### Producer Example
//!
//! ```rust,no_run
//! use serverqueue_client::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut producer = Producer::connect(ClientConfig::producer()).await?;
//!     let item = producer.produce().await?;
//!     println!("{} put {}", producer, item);
//!     Ok(())
//! }
//! ```
//!
//! ### Consumer Example
//!
//! ```rust,no_run
//! use serverqueue_client::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut consumer = Consumer::connect(ClientConfig::consumer()).await?;
//!     while let Some(item) = consumer.recv().await? {
//!         println!("{} consumed {}", consumer, item);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod consumer;
pub mod error;
pub mod producer;

pub use config::*;
pub use consumer::*;
pub use error::*;
pub use producer::*;
pub use serverqueue::Item;

/// Client library result type
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
