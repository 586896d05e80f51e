pub mod error;
pub mod logging;
pub mod mailer;
pub mod persistence;
pub mod settings;


pub use error::MailError;
pub use mailer::{Delivery, InboundMessage, Mailer, OutgoingMail, ReadOutcome, ReadRequest};
pub use settings::MailSettings;
