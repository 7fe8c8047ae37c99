//! AES-256-GCM encryption of credential payloads.
//!
//! Ciphertext format: `base64(nonce || ciphertext || tag)` with a fresh 96-bit
//! nonce per call. The key is fixed for the lifetime of the process.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use zeroize::Zeroizing;

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid encryption key: {0}")]
    InvalidEncryptionKey(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").finish_non_exhaustive()
    }
}

impl EncryptionService {
    /// Build the cipher from the configured secret.
    ///
    /// The secret is either base64 that decodes to 32 bytes or a raw
    /// 32-byte string.
    pub fn new(secret: &str) -> Result<Self, CryptoError> {
        let key = decode_key(secret)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|e| CryptoError::InvalidEncryptionKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>, CryptoError> {
        let data = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid base64: {e}")))?;

        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::DecryptionFailed(
                "ciphertext is too short".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| {
                CryptoError::DecryptionFailed("authentication tag mismatch".to_string())
            })
    }
}

fn decode_key(secret: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return Err(CryptoError::InvalidEncryptionKey(
            "encryption key is empty".to_string(),
        ));
    }

    if let Ok(decoded) = BASE64.decode(trimmed) {
        let decoded = Zeroizing::new(decoded);
        if decoded.len() == KEY_SIZE {
            return Ok(decoded);
        }
    }

    if trimmed.len() == KEY_SIZE {
        return Ok(Zeroizing::new(trimmed.as_bytes().to_vec()));
    }

    Err(CryptoError::InvalidEncryptionKey(format!(
        "expected {KEY_SIZE} bytes, raw or base64-encoded"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW_KEY: &str = "0123456789abcdef0123456789abcdef";

    fn service() -> EncryptionService {
        EncryptionService::new(RAW_KEY).unwrap()
    }

    #[test]
    fn test_round_trip_empty_payload() {
        let service = service();
        let encrypted = service.encrypt(b"").unwrap();
        assert_eq!(service.decrypt(&encrypted).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_round_trip_multi_kilobyte_payload() {
        let service = service();
        let payload: Vec<u8> = (0..16 * 1024).map(|i| (i % 251) as u8).collect();
        let encrypted = service.encrypt(&payload).unwrap();
        assert_eq!(service.decrypt(&encrypted).unwrap(), payload);
    }

    #[test]
    fn test_nonce_is_fresh_per_call() {
        let service = service();
        let first = service.encrypt(b"same input").unwrap();
        let second = service.encrypt(b"same input").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_base64_key_is_accepted() {
        let key = BASE64.encode([7u8; 32]);
        let service = EncryptionService::new(&key).unwrap();
        let encrypted = service.encrypt(b"hello").unwrap();
        assert_eq!(service.decrypt(&encrypted).unwrap(), b"hello");
    }

    #[test]
    fn test_raw_key_that_is_also_base64_is_accepted() {
        // 32 base64-alphabet characters decode to 24 bytes, so the raw form wins.
        let key = "abcdefghijklmnopqrstuvwxyzABCDEF";
        assert!(EncryptionService::new(key).is_ok());
    }

    #[test]
    fn test_wrong_key_length_fails_fast() {
        for key in ["", "short", &BASE64.encode([1u8; 16])] {
            let err = EncryptionService::new(key).unwrap_err();
            assert!(matches!(err, CryptoError::InvalidEncryptionKey(_)), "{key}");
        }
    }

    #[test]
    fn test_tampered_ciphertext_is_rejected() {
        let service = service();
        let encrypted = service.encrypt(b"account secret").unwrap();
        let mut bytes = BASE64.decode(&encrypted).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let err = service.decrypt(&BASE64.encode(bytes)).unwrap_err();
        assert!(matches!(err, CryptoError::DecryptionFailed(_)));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let encrypted = service().encrypt(b"account secret").unwrap();
        let other = EncryptionService::new(&BASE64.encode([9u8; 32])).unwrap();
        assert!(matches!(
            other.decrypt(&encrypted),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        let service = service();
        assert!(matches!(
            service.decrypt("not base64!"),
            Err(CryptoError::DecryptionFailed(_))
        ));
        assert!(matches!(
            service.decrypt(&BASE64.encode([0u8; 20])),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let rendered = format!("{:?}", service());
        assert!(!rendered.contains(RAW_KEY));
    }
}
