//! Text encoding for persisted private keys.
//!
//! A key is stored as standard base64 wrapping the lowercase hex form of
//! the raw 32-byte Ed25519 seed. The double encoding keeps the format
//! compatible with key material produced by earlier tooling.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::IdentityError;

/// Encode a raw private key into its persisted text form.
pub fn encode_secret_key(secret: &[u8; 32]) -> String {
    STANDARD.encode(hex::encode(secret))
}

/// Decode a private key from its persisted text form.
///
/// Surrounding whitespace is ignored.
pub fn decode_secret_key(text: &str) -> Result<[u8; 32], IdentityError> {
    let hex_bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| IdentityError::InvalidEncoding(format!("base64: {}", e)))?;

    let raw = hex::decode(&hex_bytes)
        .map_err(|e| IdentityError::InvalidEncoding(format!("hex: {}", e)))?;

    let len = raw.len();
    raw.try_into().map_err(|_| IdentityError::InvalidKeyLength(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let secret = [7u8; 32];
        let text = encode_secret_key(&secret);
        assert_eq!(decode_secret_key(&text).unwrap(), secret);
    }

    #[test]
    fn test_encoding_wraps_hex() {
        let text = encode_secret_key(&[0xabu8; 32]);
        let inner = STANDARD.decode(&text).unwrap();
        assert_eq!(inner, "ab".repeat(32).into_bytes());
    }

    #[test]
    fn test_decode_tolerates_whitespace() {
        let text = format!("  {}\n", encode_secret_key(&[1u8; 32]));
        assert_eq!(decode_secret_key(&text).unwrap(), [1u8; 32]);
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let result = decode_secret_key("%%% not base64 %%%");
        assert!(matches!(result, Err(IdentityError::InvalidEncoding(_))));
    }

    #[test]
    fn test_decode_rejects_bad_hex() {
        let text = STANDARD.encode("zz".repeat(32));
        let result = decode_secret_key(&text);
        assert!(matches!(result, Err(IdentityError::InvalidEncoding(_))));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let text = STANDARD.encode(hex::encode([1u8; 16]));
        assert_eq!(decode_secret_key(&text), Err(IdentityError::InvalidKeyLength(16)));
    }
}
