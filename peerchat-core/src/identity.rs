//! Node identity selection.
//!
//! A node runs either under a freshly generated key or under one of a small
//! set of provisioned keys picked by index. The provisioned keys are what the
//! built-in peer table pins, so a multi-node demo is repeatable across runs.

use std::fmt;

use crate::crypto::{decode_secret_key, EndpointId, KeyPair, PublicKey, Signature};
use crate::error::IdentityError;

/// Provisioned private keys in their persisted text encoding.
pub const PROVISIONED_KEYS: [&str; 3] = [
    "MmJkYjFmMGJjNWQxMmFmOTk3MWZiNDI2YjZhNjc1N2I3YTllNDcxYWY2OWMyYThiMDA3MDM5ZWEyNmVjODA5OQ==",
    "MzdjNGRiMDk0MWQ2ZGYyN2ZlNTViYjE0YjUwYTJkN2U5ZmM3YmY4NTQ4MzU3M2Q2MjlkZjExZmZkZGU1OWYwYQ==",
    "NmUxODYyZWZhNmEzOTcwMTlmM2FjNTEwMjRiODQ0ZTU0NjE1NTE2MGUxZmQzMGUzOGViNjVkM2VjZjQ3ZmFmMg==",
];

/// How a node picks its identity at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySelector {
    /// Generate a fresh random key.
    Generate,
    /// Use the provisioned key at this index.
    Provisioned(usize),
}

/// The cryptographic identity of a running node.
///
/// Created once at startup and never mutated.
#[derive(Clone)]
pub struct NodeIdentity {
    keypair: KeyPair,
    endpoint_id: EndpointId,
}

impl NodeIdentity {
    /// Select an identity.
    ///
    /// A provisioned index outside [`PROVISIONED_KEYS`] is an error; there is
    /// no fallback to generating a key.
    pub fn select(selector: IdentitySelector) -> Result<Self, IdentityError> {
        match selector {
            IdentitySelector::Generate => Ok(Self::from_keypair(KeyPair::generate())),
            IdentitySelector::Provisioned(index) => {
                let encoded = PROVISIONED_KEYS.get(index).ok_or(IdentityError::UnknownIndex {
                    index,
                    available: PROVISIONED_KEYS.len(),
                })?;
                Self::from_encoded(encoded)
            }
        }
    }

    /// Load an identity from a key in the persisted text encoding.
    pub fn from_encoded(text: &str) -> Result<Self, IdentityError> {
        let secret = decode_secret_key(text)?;
        Ok(Self::from_keypair(KeyPair::from_secret_bytes(&secret)))
    }

    /// Wrap an existing key pair.
    pub fn from_keypair(keypair: KeyPair) -> Self {
        let endpoint_id = keypair.endpoint_id();
        Self { keypair, endpoint_id }
    }

    /// The node's endpoint identifier.
    pub fn endpoint_id(&self) -> EndpointId {
        self.endpoint_id
    }

    /// The node's public key.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// Sign a message with the node's key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign(message)
    }

    /// Raw private key material.
    pub fn secret_bytes(&self) -> &[u8; 32] {
        self.keypair.secret_bytes()
    }
}

impl fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeIdentity")
            .field("endpoint_id", &self.endpoint_id)
            .finish_non_exhaustive()
    }
}
