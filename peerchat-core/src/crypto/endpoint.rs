//! Endpoint identifier derivation.
//!
//! An endpoint identifier is the first 20 bytes of the SHA-256 hash of
//! the Ed25519 public key. Peers pin each other by this value, and the
//! handshake proves possession of the key that hashes to it.

use std::fmt;
use std::str::FromStr;

use super::hashing::sha256;
use super::keys::PublicKey;
use crate::error::CryptoError;

/// Length of an endpoint identifier in bytes.
pub const ENDPOINT_ID_LEN: usize = 20;

/// Verifiable name of a node on the network.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId([u8; ENDPOINT_ID_LEN]);

impl EndpointId {
    /// Derive the identifier for a public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let hash = sha256(public_key.as_bytes());
        let mut id = [0u8; ENDPOINT_ID_LEN];
        id.copy_from_slice(&hash[..ENDPOINT_ID_LEN]);
        EndpointId(id)
    }

    /// Wrap raw identifier bytes.
    pub fn from_bytes(bytes: [u8; ENDPOINT_ID_LEN]) -> Self {
        EndpointId(bytes)
    }

    /// Get the raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; ENDPOINT_ID_LEN] {
        &self.0
    }

    /// Short form for log lines (first 4 bytes).
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EndpointId({})", self)
    }
}

impl FromStr for EndpointId {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidEndpointId(s.to_string()))?;
        let id: [u8; ENDPOINT_ID_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidEndpointId(s.to_string()))?;
        Ok(EndpointId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_endpoint_id_is_first_20_bytes_of_hash() {
        let kp = KeyPair::generate();
        let full_hash = sha256(kp.public_key().as_bytes());
        let id = EndpointId::from_public_key(&kp.public_key());
        assert_eq!(&full_hash[..ENDPOINT_ID_LEN], &id.as_bytes()[..]);
    }

    #[test]
    fn test_different_keys_different_ids() {
        let id1 = KeyPair::generate().endpoint_id();
        let id2 = KeyPair::generate().endpoint_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_display_parse_roundtrip() {
        let id = KeyPair::generate().endpoint_id();
        let text = id.to_string();
        assert_eq!(text.len(), 2 * ENDPOINT_ID_LEN);
        assert_eq!(text.parse::<EndpointId>().unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("not-hex".parse::<EndpointId>().is_err());
        // Valid hex, wrong length
        assert!("abcd".parse::<EndpointId>().is_err());
        assert!(matches!(
            "zz".repeat(ENDPOINT_ID_LEN).parse::<EndpointId>(),
            Err(CryptoError::InvalidEndpointId(_))
        ));
    }
}
