//! Mail dispatcher collaborator.
//!
//! Used only by password reset. Running without a configured dispatcher is
//! a legitimate operating mode, not an error state — until a reset is
//! actually requested, at which point the caller surfaces the condition to
//! administrators.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail dispatcher is not configured")]
    NotConfigured,

    #[error("mail dispatch failed: {0}")]
    Send(String),
}

#[async_trait]
pub trait MailDispatcher: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Dispatcher for deployments without outbound mail.
#[derive(Debug, Default)]
pub struct UnconfiguredMailer;

#[async_trait]
impl MailDispatcher for UnconfiguredMailer {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), MailError> {
        Err(MailError::NotConfigured)
    }
}

/// Dev-mode dispatcher: writes the mail to the log instead of sending it.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl MailDispatcher for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        tracing::info!(%to, %subject, body_len = body.len(), "mail dispatched to log");
        Ok(())
    }
}
