//! Length-prefixed framing for handshake messages.
//!
//! Frames are laid out as:
//! - 4 bytes: network magic
//! - 4 bytes: big-endian body length
//! - N bytes: bincode-serialized [`HandshakeMessage`]
//!
//! The decoder never consumes bytes past the end of a frame, so whatever the
//! peer sends after `StreamAccepted` stays in the read buffer for the chat
//! stream.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::{MAX_FRAME_SIZE, NETWORK_MAGIC};
use crate::error::{P2pError, P2pResult};
use crate::protocol::HandshakeMessage;

/// Header size: 4 bytes magic + 4 bytes length.
const HEADER_SIZE: usize = 8;

/// Codec for handshake frames.
#[derive(Debug, Default)]
pub struct HandshakeCodec {
    /// Body length of the frame being read, once its header is parsed.
    current_length: Option<usize>,
}

impl HandshakeCodec {
    /// Create a new codec.
    pub fn new() -> Self {
        Self {
            current_length: None,
        }
    }
}

fn read_header(src: &BytesMut) -> P2pResult<usize> {
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&src[0..4]);
    if magic != NETWORK_MAGIC {
        return Err(P2pError::InvalidMagic {
            expected: NETWORK_MAGIC,
            actual: magic,
        });
    }

    let mut length = [0u8; 4];
    length.copy_from_slice(&src[4..8]);
    let length = u32::from_be_bytes(length) as usize;
    if length > MAX_FRAME_SIZE {
        return Err(P2pError::MessageTooLarge {
            size: length,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(length)
}

impl Decoder for HandshakeCodec {
    type Item = HandshakeMessage;
    type Error = P2pError;

    fn decode(&mut self, src: &mut BytesMut) -> P2pResult<Option<Self::Item>> {
        let length = match self.current_length {
            Some(length) => length,
            None => {
                if src.len() < HEADER_SIZE {
                    return Ok(None);
                }
                let length = read_header(src)?;
                self.current_length = Some(length);
                length
            }
        };

        if src.len() < HEADER_SIZE + length {
            src.reserve(HEADER_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let body = src.split_to(length);
        self.current_length = None;

        let message = peerchat_core::serialization::deserialize(&body)?;
        Ok(Some(message))
    }
}

impl Encoder<HandshakeMessage> for HandshakeCodec {
    type Error = P2pError;

    fn encode(&mut self, message: HandshakeMessage, dst: &mut BytesMut) -> P2pResult<()> {
        let body = peerchat_core::serialization::serialize(&message)?;
        if body.len() > MAX_FRAME_SIZE {
            return Err(P2pError::MessageTooLarge {
                size: body.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        dst.reserve(HEADER_SIZE + body.len());
        dst.put_slice(&NETWORK_MAGIC);
        dst.put_u32(body.len() as u32);
        dst.put_slice(&body);
        Ok(())
    }
}
