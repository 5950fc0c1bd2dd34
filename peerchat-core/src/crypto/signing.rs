//! Ed25519 signature creation and verification.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::fixed_bytes;
use super::keys::{PublicKey, SecretKey};
use crate::error::CryptoError;

/// Ed25519 signature wrapper serialized as its raw 64 bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature(pub ed25519_dalek::Signature);

impl Signature {
    /// Create a Signature from raw bytes.
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Signature(ed25519_dalek::Signature::from_bytes(bytes))
    }

    /// Get the raw bytes of the signature.
    #[inline]
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        fixed_bytes::serialize(&self.to_bytes(), serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = fixed_bytes::deserialize::<D, 64>(deserializer)?;
        Ok(Signature::from_bytes(&bytes))
    }
}

/// Sign a message with a secret key.
pub fn sign(secret_key: &SecretKey, message: &[u8]) -> Signature {
    Signature(secret_key.sign(message))
}

/// Verify a signature against a message and public key.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
    public_key
        .inner()
        .verify(message, &signature.0)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_sign_verify_roundtrip() {
        let kp = KeyPair::generate();
        let signature = kp.sign(b"hello peer");
        assert!(verify(&kp.public_key(), b"hello peer", &signature).is_ok());
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();
        let signature = kp1.sign(b"hello peer");

        let result = verify(&kp2.public_key(), b"hello peer", &signature);
        assert_eq!(result, Err(CryptoError::SignatureVerificationFailed));
    }

    #[test]
    fn test_verify_rejects_tampered_message() {
        let kp = KeyPair::generate();
        let signature = kp.sign(b"hello peer");
        assert!(verify(&kp.public_key(), b"hello peeR", &signature).is_err());
    }

    #[test]
    fn test_signature_serialization() {
        let kp = KeyPair::generate();
        let signature = kp.sign(b"hello peer");

        let bytes = crate::serialization::serialize(&signature).unwrap();
        let recovered: Signature = crate::serialization::deserialize(&bytes).unwrap();

        assert_eq!(signature, recovered);
        assert!(verify(&kp.public_key(), b"hello peer", &recovered).is_ok());
    }
}
