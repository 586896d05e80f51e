//! The two protocol sessions a [`Mailer`](crate::mailer::Mailer) drives.
//!
//! Production code uses [`SmtpOutbound`](crate::mailer::smtp::SmtpOutbound)
//! and [`ImapInbound`](crate::mailer::imap::ImapInbound); tests substitute
//! in-memory doubles.

use async_trait::async_trait;
use lettre::Message;

use crate::error::MailError;

/// An authenticated connection to a mail submission server.
#[async_trait]
pub trait Outbound: Send {
    /// Submits one message.
    async fn transmit(&mut self, message: &Message) -> Result<(), MailError>;

    /// Re-establishes the encrypted channel and authenticates again.
    async fn reconnect(&mut self) -> Result<(), MailError>;

    /// Releases the connection.
    async fn close(&mut self) -> Result<(), MailError> {
        Ok(())
    }
}

/// An authenticated connection to a mail retrieval server.
#[async_trait]
pub trait Inbound: Send {
    /// Makes `mailbox` the target of later searches and fetches.
    async fn select(&mut self, mailbox: &str) -> Result<(), MailError>;

    /// Runs a search command (`ALL`, `UNSEEN`, ...) and returns the matching
    /// message sequence numbers in any order.
    async fn search(&mut self, query: &str) -> Result<Vec<u32>, MailError>;

    /// Fetches the full RFC 822 source of one message.
    async fn fetch(&mut self, id: u32) -> Result<Vec<u8>, MailError>;

    /// Ends the session.
    async fn logout(&mut self) -> Result<(), MailError>;
}
