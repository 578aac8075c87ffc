//! Encryption key assembly from local and remote components.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Key assembly errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Remote key fetch failed: {0}")]
    RemoteFetch(String),

    #[error("Remote key endpoint returned status {0}")]
    RemoteStatus(u16),
}

/// Derive the 256-bit encryption key from local and remote key material.
///
/// The components are concatenated and hashed; an empty remote component
/// yields a local-only key (the debug-mode degraded path).
pub fn derive_key(local: &str, remote: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(local.as_bytes());
    hasher.update(remote.as_bytes());
    hasher.finalize().into()
}

/// Fetch the remote key component and combine it with the local secret.
///
/// Called once at startup, after config load. The URL is expected to return
/// the key material as its plain-text body.
pub async fn assemble_key(local: &str, remote_url: &str) -> Result<[u8; 32], KeyError> {
    let response = reqwest::get(remote_url)
        .await
        .map_err(|e| KeyError::RemoteFetch(e.to_string()))?;

    if !response.status().is_success() {
        return Err(KeyError::RemoteStatus(response.status().as_u16()));
    }

    let remote = response
        .text()
        .await
        .map_err(|e| KeyError::RemoteFetch(e.to_string()))?;

    Ok(derive_key(local, remote.trim()))
}
