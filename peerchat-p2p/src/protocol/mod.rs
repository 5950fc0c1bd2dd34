//! Wire protocol spoken before a chat stream exists.
//!
//! This module contains:
//! - Handshake and stream negotiation messages
//! - Length-prefixed framing codec
//! - Mutual Ed25519 authentication
//! - Application protocol negotiation

pub mod auth;
pub mod framing;
pub mod messages;
pub mod negotiate;

// Re-export main types
pub use auth::{authenticate, AuthenticatedPeer};
pub use framing::HandshakeCodec;
pub use messages::{HandshakeMessage, HelloMessage, ProofMessage, NONCE_LEN};
pub use negotiate::{answer_stream_requests, request_stream};
