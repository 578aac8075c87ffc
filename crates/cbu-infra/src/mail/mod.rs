//! Outbound mail implementations.
//!
//! The SMTP mailer is the real transport; the log mailer is the fallback when
//! `MAIL` is not configured, so the security layer can always hand off a
//! password-reset message without caring whether delivery is wired up.

mod log;
mod smtp;

pub use log::LogMailer;
pub use smtp::{MailConfig, SmtpMailer};
