//! # ServerQueue Wire Protocol
//!
//! Every frame is length-prefixed and carries a protocol version so the
//! encoding can evolve without breaking existing peers:
//!
//! ```text
//! +----------------+---------+------+----------------+
//! | length (u32be) | version | kind | body           |
//! +----------------+---------+------+----------------+
//!                    ^ length counts from here
//! ```
//!
//! | kind | frame | body                          |
//! |------|-------|-------------------------------|
//! | 0x01 | Hello | role byte (0 producer, 1 consumer) |
//! | 0x02 | Item  | 16-byte UUID token            |
//! | 0x03 | Ack   | literal `ACK`                 |
//!
//! ## Connection sequences
//!
//! - Producer endpoint: `server→client Hello`, then repeated
//!   `client→server Item`, `server→client Ack`.
//! - Consumer endpoint: `server→client Hello`, then repeated
//!   `server→client Item`. The consumer never writes after connecting.

pub mod codec;

pub use codec::WireCodec;

use crate::item::Item;
use crate::ServerQueueError;
use std::fmt;

/// Current wire protocol version
pub const PROTOCOL_VERSION: u8 = 1;

/// Acknowledgement literal sent to producers after a successful `put`
pub const ACK_TOKEN: &[u8] = b"ACK";

/// Which side of the queue a connection serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Role {
    Producer = 0,
    Consumer = 1,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Producer => f.write_str("producer"),
            Role::Consumer => f.write_str("consumer"),
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = ServerQueueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Role::Producer),
            1 => Ok(Role::Consumer),
            other => Err(ServerQueueError::protocol(format!(
                "Unknown role byte: {}",
                other
            ))),
        }
    }
}

/// A decoded wire frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Broker greeting naming the endpoint's role
    Hello { role: Role },
    /// One item in transit
    Item(Item),
    /// Producer acknowledgement
    Ack,
}

impl Frame {
    /// Short name used in log and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Frame::Hello { .. } => "Hello",
            Frame::Item(_) => "Item",
            Frame::Ack => "Ack",
        }
    }
}
