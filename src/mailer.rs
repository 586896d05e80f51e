//! Send and poll one mail account.
//!
//! A [`Mailer`] owns an outbound (SMTP) and an inbound (IMAP) session, both
//! authenticated up front, plus the allow-list of senders that [`Mailer::read`]
//! filters on by default.
//!
//! ```ignore
//! let settings = MailSettings::new("me@gmail.com");
//! let mut mailer = Mailer::connect(settings, &password).await?;
//!
//! mailer.send(OutgoingMail::to("you@example.com").subject("Hi").image("cat.png")).await?;
//!
//! if let ReadOutcome::Messages(messages) = mailer.read(ReadRequest::default().amount(5)).await? {
//!     display::display_messages(&messages);
//! }
//! mailer.disconnect().await?;
//! ```

use std::fmt;
use std::path::PathBuf;

use log::{error, info, warn};
use serde_json::Value;

use crate::error::MailError;
use crate::persistence;
use crate::settings::MailSettings;

pub mod compose;
pub mod display;
pub mod encryption;
pub mod imap;
pub mod message;
pub mod session;
pub mod smtp;

pub use compose::OutgoingMail;
pub use message::{Attachment, InboundMessage};
pub use session::{Inbound, Outbound};

use self::imap::ImapInbound;
use self::smtp::SmtpOutbound;

pub const DEFAULT_MAILBOX: &str = "INBOX";

/// Parameters for [`Mailer::read`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    /// Maximum number of messages to return.
    pub amount: usize,
    /// Search `UNSEEN` instead of `ALL`.
    pub unread_only: bool,
    /// Sender filter; `None` falls back to the mailer's allow-list. An empty
    /// list disables filtering.
    pub allowed_senders: Option<Vec<String>>,
    pub mailbox: String,
}

impl Default for ReadRequest {
    fn default() -> Self {
        Self {
            amount: 1,
            unread_only: true,
            allowed_senders: None,
            mailbox: DEFAULT_MAILBOX.to_string(),
        }
    }
}

impl ReadRequest {
    pub fn amount(mut self, amount: usize) -> Self {
        self.amount = amount;
        self
    }

    pub fn unread_only(mut self, unread_only: bool) -> Self {
        self.unread_only = unread_only;
        self
    }

    pub fn allowed_senders<S: Into<String>>(mut self, senders: impl IntoIterator<Item = S>) -> Self {
        self.allowed_senders = Some(senders.into_iter().map(Into::into).collect());
        self
    }

    pub fn mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = mailbox.into();
        self
    }
}

/// What a successful [`Mailer::read`] found.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// Matching messages, newest first. May be empty when every candidate
    /// was filtered out.
    Messages(Vec<InboundMessage>),
    /// The search itself matched nothing.
    NoMessages,
}

/// Receipt for a delivered message.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipient: String,
    /// 1 when the first transmit succeeded, 2 after a reconnect.
    pub attempts: u8,
    pub skipped_images: Vec<PathBuf>,
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Successfully sent email to: {}", self.recipient)
    }
}

pub struct Mailer<O = SmtpOutbound, I = ImapInbound> {
    settings: MailSettings,
    outbound: O,
    inbound: I,
    // None after a failed SELECT: the server then has no mailbox selected
    selected_mailbox: Option<String>,
    allowed_senders: Vec<String>,
    saved_emails: Vec<Value>,
}

impl Mailer {
    /// Opens and authenticates both sessions for `settings.email_address`.
    ///
    /// Fails with [`MailError::Connection`] or [`MailError::Authentication`]
    /// if either server cannot be used.
    pub async fn connect(settings: MailSettings, password: &str) -> Result<Self, MailError> {
        let outbound = SmtpOutbound::connect(
            &settings.smtp_server,
            settings.smtp_port,
            &settings.email_address,
            password,
        )
        .await
        .inspect_err(|e| error!("Error logging in: {}", e))?;

        let inbound = ImapInbound::connect(
            &settings.imap_server,
            settings.imap_port,
            &settings.email_address,
            password,
        )
        .await
        .inspect_err(|e| error!("Error logging in: {}", e))?;

        Self::from_sessions(settings, outbound, inbound).await
    }
}

impl<O: Outbound, I: Inbound> Mailer<O, I> {
    /// Wraps already-authenticated sessions, loads both list files and
    /// selects the inbox.
    pub async fn from_sessions(
        settings: MailSettings,
        outbound: O,
        mut inbound: I,
    ) -> Result<Self, MailError> {
        let allowed_senders: Vec<String> = persistence::load(&settings.allowed_emails_path);
        let saved_emails: Vec<Value> = persistence::load(&settings.saved_emails_path);
        info!(
            "Loaded {} allowed senders and {} saved emails",
            allowed_senders.len(),
            saved_emails.len()
        );

        select(&mut inbound, DEFAULT_MAILBOX).await?;

        Ok(Self {
            settings,
            outbound,
            inbound,
            selected_mailbox: Some(DEFAULT_MAILBOX.to_string()),
            allowed_senders,
            saved_emails,
        })
    }

    pub fn settings(&self) -> &MailSettings {
        &self.settings
    }

    pub fn allowed_senders(&self) -> &[String] {
        &self.allowed_senders
    }

    /// Contents of the saved-emails file as loaded at construction. Nothing
    /// in this crate reads or updates it.
    pub fn saved_emails(&self) -> &[Value] {
        &self.saved_emails
    }

    /// Adds `address` to the in-memory allow-list. Returns `false` if it was
    /// already present.
    pub fn allow_sender(&mut self, address: impl Into<String>) -> bool {
        let address = address.into();
        if self.allowed_senders.contains(&address) {
            return false;
        }
        self.allowed_senders.push(address);
        true
    }

    /// Writes the allow-list back to its file.
    pub fn save_allowed_senders(&self) {
        persistence::save(&self.settings.allowed_emails_path, &self.allowed_senders);
    }

    /// Sends `mail` from the account address.
    ///
    /// If the first transmit fails the outbound session is reconnected and
    /// the message sent once more. Images that cannot be attached are listed
    /// in [`Delivery::skipped_images`] and do not stop the send.
    pub async fn send(&mut self, mail: OutgoingMail) -> Result<Delivery, MailError> {
        let composed = compose::build_message(&self.settings.email_address, &mail)?;

        let first_error = match self.outbound.transmit(&composed.message).await {
            Ok(()) => {
                info!("Successfully sent email to: {}", mail.recipient);
                return Ok(Delivery {
                    recipient: mail.recipient,
                    attempts: 1,
                    skipped_images: composed.skipped_images,
                });
            }
            Err(e) => e,
        };
        warn!("Sending to {} failed, reconnecting: {}", mail.recipient, first_error);

        let retry = match self.outbound.reconnect().await {
            Ok(()) => self.outbound.transmit(&composed.message).await,
            Err(e) => Err(e),
        };

        match retry {
            Ok(()) => {
                info!("Successfully sent email to: {} after reconnecting", mail.recipient);
                Ok(Delivery {
                    recipient: mail.recipient,
                    attempts: 2,
                    skipped_images: composed.skipped_images,
                })
            }
            Err(e) => {
                error!("Error sending email to {}: {}", mail.recipient, e);
                Err(MailError::Send {
                    recipient: mail.recipient,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Reads up to `request.amount` messages, newest first.
    ///
    /// Messages whose sender is not in the effective filter are skipped and
    /// do not count toward the amount. A message that fails to fetch is
    /// logged and skipped.
    pub async fn read(&mut self, request: ReadRequest) -> Result<ReadOutcome, MailError> {
        if self.selected_mailbox.as_deref() != Some(request.mailbox.as_str()) {
            self.selected_mailbox = None;
            select(&mut self.inbound, &request.mailbox).await?;
            self.selected_mailbox = Some(request.mailbox.clone());
        }

        let criteria = if request.unread_only { "UNSEEN" } else { "ALL" };
        let mut ids = self
            .inbound
            .search(criteria)
            .await
            .map_err(|e| MailError::Search(failure_reason(e)))?;

        if ids.is_empty() {
            info!("No emails found in {}", request.mailbox);
            return Ok(ReadOutcome::NoMessages);
        }

        // Sequence numbers grow with arrival, so descending is newest first
        ids.sort_unstable_by(|a, b| b.cmp(a));

        let filter = request
            .allowed_senders
            .as_deref()
            .unwrap_or(self.allowed_senders.as_slice());

        let mut messages = Vec::new();
        for id in ids {
            if messages.len() >= request.amount {
                break;
            }

            let raw = match self.inbound.fetch(id).await {
                Ok(raw) => raw,
                Err(e) => {
                    error!("Error fetching email ID {}: {}", id, e);
                    continue;
                }
            };

            let envelope = message::Envelope::parse(&raw).inspect_err(|e| error!("{}", e))?;
            if !filter.is_empty() && !filter.iter().any(|allowed| allowed == envelope.sender()) {
                continue;
            }
            messages.push(envelope.into_message().inspect_err(|e| error!("{}", e))?);
        }

        info!("Read {} emails from {}", messages.len(), request.mailbox);
        Ok(ReadOutcome::Messages(messages))
    }

    /// Logs out of the inbound session and closes the outbound one.
    pub async fn disconnect(mut self) -> Result<(), MailError> {
        let inbound = self.inbound.logout().await;
        let outbound = self.outbound.close().await;
        inbound.and(outbound)
    }
}

async fn select<I: Inbound>(inbound: &mut I, mailbox: &str) -> Result<(), MailError> {
    inbound.select(mailbox).await.map_err(|e| MailError::Select {
        mailbox: mailbox.to_string(),
        reason: failure_reason(e),
    })
}

// The server's own message, without the wrapping variant's prefix
fn failure_reason(error: MailError) -> String {
    match error {
        MailError::Imap(inner) => inner.to_string(),
        MailError::Connection { reason, .. }
        | MailError::Fetch { reason, .. }
        | MailError::Select { reason, .. } => reason,
        MailError::Search(reason) | MailError::Read(reason) => reason,
        other => other.to_string(),
    }
}
