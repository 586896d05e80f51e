//! Error type shared by every mail operation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while connecting, sending or reading mail.
#[derive(Debug, Error)]
pub enum MailError {
    /// A server could not be reached or the TLS handshake failed.
    #[error("cannot connect to {server}: {reason}")]
    Connection { server: String, reason: String },

    /// The server rejected the account credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The mailbox could not be selected.
    #[error("cannot select mailbox {mailbox}: {reason}")]
    Select { mailbox: String, reason: String },

    /// The mailbox search command failed.
    #[error("error searching emails: {0}")]
    Search(String),

    /// A single message could not be fetched.
    #[error("error fetching email {id}: {reason}")]
    Fetch { id: u32, reason: String },

    /// Reading the mailbox failed part way through.
    #[error("error reading emails: {0}")]
    Read(String),

    /// The message was not delivered, even after reconnecting.
    #[error("error sending email to {recipient}: {reason}")]
    Send { recipient: String, reason: String },

    /// An address could not be parsed.
    #[error("invalid address {0}")]
    InvalidAddress(String),

    /// The outbound message could not be assembled.
    #[error("cannot build message: {0}")]
    Compose(String),

    /// The settings file is missing or malformed.
    #[error("cannot load settings from {path}: {reason}")]
    Settings { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IMAP error: {0}")]
    Imap(#[from] async_imap::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),
}
