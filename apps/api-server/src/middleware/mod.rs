//! Request middleware: authentication/identity and error translation.

pub mod auth;
pub mod error;
