//! Third-party token encryption.
//!
//! Social and payment provider tokens are stored encrypted with a key
//! assembled from a local secret and a remotely fetched component, so neither
//! the database nor the config file alone is enough to recover them.

mod cipher;
mod key;

pub use cipher::{CryptoError, TokenCipher};
pub use key::{KeyError, assemble_key, derive_key};
