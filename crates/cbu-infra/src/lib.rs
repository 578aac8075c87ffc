//! # CBU Infrastructure
//!
//! Concrete implementations of the ports defined in `cbu-core`:
//! database repositories, JWT/Argon2 authentication, outbound mail,
//! third-party token encryption, and image upload sets.
//!
//! ## Feature Flags
//!
//! - `postgres` (default) - PostgreSQL repositories via SeaORM; without it
//!   only the in-memory repositories are available.

pub mod auth;
pub mod crypto;
pub mod database;
pub mod mail;
pub mod uploads;

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use crypto::{CryptoError, KeyError, TokenCipher, assemble_key, derive_key};
pub use database::memory::InMemoryStore;
pub use mail::{LogMailer, MailConfig, SmtpMailer};
pub use uploads::{IMAGES, UploadError, UploadSet};

#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, connect};
