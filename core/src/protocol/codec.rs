//! Length-prefixed frame codec used on both listener endpoints.

use super::{Frame, Role, ACK_TOKEN, PROTOCOL_VERSION};
use crate::item::{Item, ITEM_TOKEN_LEN};
use crate::{Result, ServerQueueError};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

const LENGTH_PREFIX_LEN: usize = 4;
/// version + kind
const HEADER_LEN: usize = 2;
/// Largest frame body accepted; every valid frame is far below this
pub const MAX_FRAME_LEN: usize = 64;

const KIND_HELLO: u8 = 0x01;
const KIND_ITEM: u8 = 0x02;
const KIND_ACK: u8 = 0x03;

/// Frame codec for `tokio_util::codec::Framed`
#[derive(Debug, Default, Clone, Copy)]
pub struct WireCodec;

impl WireCodec {
    pub fn new() -> Self {
        Self
    }
}

fn expect_body_len(kind: &str, body: &BytesMut, expected: usize) -> Result<()> {
    if body.len() != expected {
        return Err(ServerQueueError::protocol(format!(
            "{} frame body must be {} bytes, got {}",
            kind,
            expected,
            body.len()
        )));
    }
    Ok(())
}

impl Decoder for WireCodec {
    type Item = Frame;
    type Error = ServerQueueError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < LENGTH_PREFIX_LEN {
            return Ok(None);
        }

        // Peek at the length without consuming it
        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if !(HEADER_LEN..=MAX_FRAME_LEN).contains(&length) {
            return Err(ServerQueueError::protocol(format!(
                "Invalid frame length: {}",
                length
            )));
        }

        let total_length = LENGTH_PREFIX_LEN + length;
        if src.len() < total_length {
            src.reserve(total_length - src.len());
            return Ok(None);
        }

        let mut body = src.split_to(total_length);
        body.advance(LENGTH_PREFIX_LEN);

        let version = body.get_u8();
        if version != PROTOCOL_VERSION {
            return Err(ServerQueueError::protocol(format!(
                "Unsupported protocol version {} (expected {})",
                version, PROTOCOL_VERSION
            )));
        }

        let frame = match body.get_u8() {
            KIND_HELLO => {
                expect_body_len("Hello", &body, 1)?;
                Frame::Hello {
                    role: Role::try_from(body.get_u8())?,
                }
            }
            KIND_ITEM => {
                expect_body_len("Item", &body, ITEM_TOKEN_LEN)?;
                let mut token = [0u8; ITEM_TOKEN_LEN];
                body.copy_to_slice(&mut token);
                Frame::Item(Item::from_bytes(token))
            }
            KIND_ACK => {
                if !body[..].eq_ignore_ascii_case(ACK_TOKEN) {
                    return Err(ServerQueueError::protocol(format!(
                        "Invalid acknowledgement: {:?}",
                        String::from_utf8_lossy(&body)
                    )));
                }
                Frame::Ack
            }
            other => {
                return Err(ServerQueueError::protocol(format!(
                    "Unknown frame kind: 0x{:02x}",
                    other
                )))
            }
        };

        Ok(Some(frame))
    }
}

impl Encoder<Frame> for WireCodec {
    type Error = ServerQueueError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        let role_buf;
        let (kind, body): (u8, &[u8]) = match &frame {
            Frame::Hello { role } => {
                role_buf = [*role as u8];
                (KIND_HELLO, &role_buf)
            }
            Frame::Item(item) => (KIND_ITEM, item.as_bytes()),
            Frame::Ack => (KIND_ACK, ACK_TOKEN),
        };

        let length = HEADER_LEN + body.len();
        dst.reserve(LENGTH_PREFIX_LEN + length);
        dst.put_u32(length as u32);
        dst.put_u8(PROTOCOL_VERSION);
        dst.put_u8(kind);
        dst.put_slice(body);
        Ok(())
    }
}
