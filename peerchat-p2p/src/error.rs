//! P2P error types.

use std::io;
use std::net::SocketAddr;

use peerchat_core::{CryptoError, EndpointId, IdentityError, SerializationError};
use thiserror::Error;

/// P2P-specific errors.
#[derive(Debug, Error)]
pub enum P2pError {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to serialize or deserialize a message.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Frame exceeds maximum allowed size.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Invalid network magic bytes.
    #[error("Invalid network magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },

    /// Node identity could not be loaded.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Malformed peer or listen address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Peer directory has no entry at this index.
    #[error("No peer at index {index} (directory has {len} entries)")]
    PeerIndexOutOfRange { index: usize, len: usize },

    /// Handshake failed.
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Handshake timed out.
    #[error("Handshake timeout")]
    HandshakeTimeout,

    /// Connection timed out.
    #[error("Connection timeout to {addr}")]
    ConnectionTimeout { addr: SocketAddr },

    /// Handshake version incompatible.
    #[error("Incompatible handshake version: {peer_version} (our version: {our_version})")]
    IncompatibleVersion { peer_version: u32, our_version: u32 },

    /// Peer sent an unexpected message.
    #[error("Unexpected message: expected {expected}, got {actual}")]
    UnexpectedMessage { expected: String, actual: String },

    /// Peer proved a different identity than the one pinned for it.
    #[error("Identity mismatch: expected {expected}, peer proved {actual}")]
    IdentityMismatch { expected: EndpointId, actual: EndpointId },

    /// Peer disconnected unexpectedly.
    #[error("Peer disconnected: {reason}")]
    PeerDisconnected { reason: String },

    /// Remote side refused the requested application protocol.
    #[error("Protocol {protocol} rejected: {reason}")]
    ProtocolRejected { protocol: String, reason: String },

    /// The session already handed its connection to a stream.
    #[error("Session already consumed by an open stream")]
    SessionClosed,

    /// Dialing a peer exhausted its retry budget.
    #[error("Connecting to {peer} failed after {attempts} attempts: {source}")]
    ConnectFailed {
        peer: EndpointId,
        attempts: u32,
        source: Box<P2pError>,
    },

    /// Opening the chat stream exhausted its retry budget.
    #[error("Opening stream to {peer} failed after {attempts} attempts: {source}")]
    StreamNegotiationFailed {
        peer: EndpointId,
        attempts: u32,
        source: Box<P2pError>,
    },

    /// Channel send error.
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Node is shutting down.
    #[error("Node shutting down")]
    Shutdown,
}

impl From<SerializationError> for P2pError {
    fn from(err: SerializationError) -> Self {
        P2pError::Serialization(err.to_string())
    }
}

impl From<CryptoError> for P2pError {
    fn from(err: CryptoError) -> Self {
        P2pError::HandshakeFailed(err.to_string())
    }
}

/// Result type for P2P operations.
pub type P2pResult<T> = Result<T, P2pError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_connect_failed_exposes_last_cause() {
        let peer = EndpointId::from_bytes([1u8; 20]);
        let err = P2pError::ConnectFailed {
            peer,
            attempts: 5,
            source: Box::new(P2pError::HandshakeTimeout),
        };

        assert!(err.to_string().contains("after 5 attempts"));
        let cause = err.source().expect("source");
        assert_eq!(cause.to_string(), "Handshake timeout");
    }

    #[test]
    fn test_crypto_error_maps_to_handshake_failure() {
        let err: P2pError = CryptoError::SignatureVerificationFailed.into();
        assert!(matches!(err, P2pError::HandshakeFailed(_)));
    }
}
