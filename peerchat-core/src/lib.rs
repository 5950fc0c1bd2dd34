//! # Peerchat Core
//!
//! Identity and serialization primitives shared by every peerchat crate:
//! - Ed25519 key pairs, signatures and SHA-256 hashing
//! - Endpoint identifiers derived from public keys
//! - The persisted text encoding for private keys
//! - Provisioned node identities selected by index
//! - Deterministic binary serialization

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crypto;
pub mod error;
pub mod identity;
pub mod serialization;

// Re-export commonly used types at crate root
pub use crypto::{
    decode_secret_key, encode_secret_key, EndpointId, KeyPair, PublicKey, SecretKey, Signature,
};
pub use error::{CryptoError, IdentityError, SerializationError};
pub use identity::{IdentitySelector, NodeIdentity, PROVISIONED_KEYS};
