/// Outbound email
///
/// The invite flow depends only on the [`Mailer`] trait. Two implementations
/// ship with the crate:
///
/// - [`smtp::SmtpMailer`]: async SMTP over rustls via `lettre`
/// - [`LogMailer`]: writes the message to the log instead of sending it,
///   for local runs without an SMTP relay
///
/// Messages are rendered by [`templates`].

pub mod smtp;
pub mod templates;

use async_trait::async_trait;

pub use smtp::{SmtpConfig, SmtpMailer};
pub use templates::invite_email;

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Sender or recipient is not a valid mailbox
    #[error("Invalid address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Message could not be assembled
    #[error("Failed to build message: {0}")]
    Build(String),

    /// Relay rejected the message or could not be reached
    #[error("Failed to send message: {0}")]
    Transport(String),
}

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Mailer that logs messages instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.text,
            "SMTP not configured, email logged instead of sent"
        );
        Ok(())
    }
}
