//! Log-only mailer - used when no SMTP server is configured, and in tests
//! to assert on what would have been delivered.

use async_trait::async_trait;
use tokio::sync::Mutex;

use cbu_core::ports::{MailError, MailMessage, Mailer};

/// Mailer that logs messages instead of delivering them.
#[derive(Default)]
pub struct LogMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far, oldest first.
    pub async fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Mail not configured; message logged instead of delivered"
        );
        self.sent.lock().await.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_messages() {
        let mailer = LogMailer::new();
        mailer
            .send(MailMessage::new("a@b.c", "Hello", "body"))
            .await
            .unwrap();

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Hello");
    }
}
