//! Handshake and stream negotiation messages.
//!
//! These are only exchanged before a chat stream is established. Once a
//! stream is accepted the connection carries newline-delimited text.

use std::fmt;

use peerchat_core::{PublicKey, Signature};
use serde::{Deserialize, Serialize};

/// Length of the handshake challenge nonce.
pub const NONCE_LEN: usize = 32;

/// First message each side sends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelloMessage {
    /// Handshake version.
    pub version: u32,
    /// Sender's Ed25519 public key.
    pub public_key: PublicKey,
    /// Fresh challenge the other side must sign.
    pub nonce: [u8; NONCE_LEN],
}

/// Proof of possession of the key announced in [`HelloMessage`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofMessage {
    /// Signature over the authentication transcript.
    pub signature: Signature,
}

/// All pre-stream messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum HandshakeMessage {
    /// Identity announcement and challenge.
    Hello(HelloMessage),
    /// Challenge response.
    Proof(ProofMessage),
    /// Dialer asks for a stream speaking `protocol`.
    OpenStream { protocol: String },
    /// Responder accepts the stream; the connection now carries chat text.
    StreamAccepted { protocol: String },
    /// Responder refuses the protocol; the session stays open.
    StreamRejected { protocol: String, reason: String },
}

impl HandshakeMessage {
    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            HandshakeMessage::Hello(_) => "Hello",
            HandshakeMessage::Proof(_) => "Proof",
            HandshakeMessage::OpenStream { .. } => "OpenStream",
            HandshakeMessage::StreamAccepted { .. } => "StreamAccepted",
            HandshakeMessage::StreamRejected { .. } => "StreamRejected",
        }
    }
}

impl fmt::Display for HandshakeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
