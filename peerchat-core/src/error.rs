//! Error types for the peerchat core crate.

use std::fmt;

/// Errors related to cryptographic operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CryptoError {
    /// The public key is malformed or invalid.
    InvalidPublicKey,
    /// Signature verification failed (signature doesn't match message/key).
    SignatureVerificationFailed,
    /// Text is not a valid endpoint identifier.
    InvalidEndpointId(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::InvalidPublicKey => write!(f, "invalid public key format"),
            CryptoError::SignatureVerificationFailed => write!(f, "signature verification failed"),
            CryptoError::InvalidEndpointId(text) => write!(f, "invalid endpoint id: {:?}", text),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Errors related to serialization and deserialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to encode data to bytes.
    EncodeFailed(String),
    /// Failed to decode data from bytes.
    DecodeFailed(String),
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::EncodeFailed(msg) => write!(f, "encode failed: {}", msg),
            SerializationError::DecodeFailed(msg) => write!(f, "decode failed: {}", msg),
        }
    }
}

impl std::error::Error for SerializationError {}

/// Errors raised while selecting or loading a node identity.
///
/// All of these are fatal at startup: a node without its expected key is
/// unreachable under the endpoint id its peers have pinned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityError {
    /// Requested provisioned key index does not exist.
    UnknownIndex {
        /// Index that was requested.
        index: usize,
        /// Number of provisioned keys.
        available: usize,
    },
    /// Key text is not valid base64, or its payload is not valid hex.
    InvalidEncoding(String),
    /// Decoded key material has the wrong length.
    InvalidKeyLength(usize),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::UnknownIndex { index, available } => write!(
                f,
                "no provisioned identity at index {} ({} available)",
                index, available
            ),
            IdentityError::InvalidEncoding(msg) => write!(f, "invalid key encoding: {}", msg),
            IdentityError::InvalidKeyLength(len) => {
                write!(f, "invalid key length: {} bytes (expected 32)", len)
            }
        }
    }
}

impl std::error::Error for IdentityError {}
