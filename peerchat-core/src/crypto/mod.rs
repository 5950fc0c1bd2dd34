//! Cryptographic primitives for peerchat identities.
//!
//! This module provides:
//! - Ed25519 key pair generation, signing, and verification
//! - SHA-256 hashing
//! - Endpoint identifier derivation (first 20 bytes of SHA-256 of public key)
//! - The persisted text encoding of private keys (base64 over hex)

mod encoding;
mod endpoint;
mod fixed_bytes;
mod hashing;
mod keys;
mod signing;

pub use encoding::{decode_secret_key, encode_secret_key};
pub use endpoint::{EndpointId, ENDPOINT_ID_LEN};
pub use hashing::{sha256, sha256_concat};
pub use keys::{KeyPair, PublicKey, SecretKey};
pub use signing::{sign, verify, Signature};
