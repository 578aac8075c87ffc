//! AES-256-GCM cipher for third-party tokens at rest.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;

/// Nonce size for AES-GCM, in bytes.
const NONCE_LEN: usize = 12;

/// Cipher errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed")]
    Decrypt,

    #[error("Ciphertext is malformed: {0}")]
    Malformed(String),
}

/// Encrypts and decrypts provider tokens with the assembled key.
///
/// Output format: base64(nonce || ciphertext), one fresh random nonce per
/// encryption.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    pub fn new(key: [u8; 32]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    pub fn decrypt(&self, sealed: &str) -> Result<String, CryptoError> {
        let raw = BASE64
            .decode(sealed)
            .map_err(|e| CryptoError::Malformed(e.to_string()))?;

        if raw.len() <= NONCE_LEN {
            return Err(CryptoError::Malformed("too short".to_string()));
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|e| CryptoError::Malformed(e.to_string()))
    }
}
