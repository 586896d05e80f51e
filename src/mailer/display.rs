use crate::mailer::message::InboundMessage;
use log::{debug, error, info};

/// One-line description of a message for the log.
pub fn summary(message: &InboundMessage) -> String {
    let names: Vec<&str> = message
        .attachments
        .iter()
        .map(|attachment| attachment.filename.as_str())
        .collect();

    if names.is_empty() {
        format!("{} | {}", message.sender, message.subject)
    } else {
        format!("{} | {} | attachments: {}", message.sender, message.subject, names.join(", "))
    }
}

/// Logs each message: its summary at info level, the full JSON record
/// (attachments base64) at debug level.
pub fn display_messages(messages: &[InboundMessage]) {
    for message in messages {
        info!("{}", summary(message));
        match serde_json::to_string_pretty(message) {
            Ok(json) => debug!("{}", json),
            Err(e) => error!("Error converting to JSON: {}", e),
        }
        if !message.body.is_empty() {
            info!("{}", message.body.trim_end());
        }
        info!("---");
    }
}
