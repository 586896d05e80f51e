use std::fs;
use std::path::{Path, PathBuf};

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use log::error;

use crate::error::MailError;

/// A message to send: one recipient, optional subject, body and image files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingMail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub images: Vec<PathBuf>,
}

impl OutgoingMail {
    pub fn to(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            ..Default::default()
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Attaches an image by path; order is preserved.
    pub fn image(mut self, path: impl Into<PathBuf>) -> Self {
        self.images.push(path.into());
        self
    }
}

/// A built message plus the image paths that could not be attached.
#[derive(Debug)]
pub struct Composed {
    pub message: Message,
    pub skipped_images: Vec<PathBuf>,
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|e| MailError::InvalidAddress(format!("{:?}: {}", address, e)))
}

// "shots/cat.PNG" -> ("cat.PNG", "image/png"); a name without a dot is its
// own subtype
fn image_name_and_type(path: &Path) -> Result<(String, ContentType), MailError> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| MailError::Compose(format!("{} has no file name", path.display())))?;

    let subtype = filename.rsplit('.').next().unwrap_or(&filename).to_lowercase();
    let content_type = ContentType::parse(&format!("image/{}", subtype))
        .map_err(|e| MailError::Compose(format!("image/{}: {}", subtype, e)))?;

    Ok((filename, content_type))
}

fn image_part(path: &Path) -> Result<SinglePart, MailError> {
    let (filename, content_type) = image_name_and_type(path)?;
    let content = fs::read(path)?;
    Ok(Attachment::new(filename).body(content, content_type))
}

/// Builds the MIME message for `mail`, sent from `from`.
///
/// Images that cannot be read or typed are logged and left out; the rest of
/// the message is still built.
pub fn build_message(from: &str, mail: &OutgoingMail) -> Result<Composed, MailError> {
    let builder = Message::builder()
        .from(parse_mailbox(from)?)
        .to(parse_mailbox(&mail.recipient)?)
        .subject(mail.subject.as_str());

    let mut skipped_images = Vec::new();
    let mut images = Vec::new();
    for path in &mail.images {
        match image_part(path) {
            Ok(part) => images.push(part),
            Err(e) => {
                error!("Error attaching image {}: {}", path.display(), e);
                skipped_images.push(path.clone());
            }
        }
    }

    let message = if images.is_empty() {
        builder
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
    } else {
        let multipart = images.into_iter().fold(
            MultiPart::mixed().singlepart(SinglePart::plain(mail.body.clone())),
            |multipart, image| multipart.singlepart(image),
        );
        builder.multipart(multipart)
    }
    .map_err(|e| MailError::Compose(e.to_string()))?;

    Ok(Composed {
        message,
        skipped_images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn image_subtype_comes_from_extension() {
        let (name, content_type) = image_name_and_type(Path::new("shots/cat.PNG")).unwrap();
        assert_eq!(name, "cat.PNG");
        assert_eq!(content_type, ContentType::parse("image/png").unwrap());
    }

    #[test]
    fn text_only_message_has_headers() {
        let mail = OutgoingMail::to("a@example.com").subject("Hi").body("body");
        let composed = build_message("me@example.com", &mail).unwrap();

        let text = formatted(&composed.message);
        assert!(text.contains("To: a@example.com"));
        assert!(text.contains("From: me@example.com"));
        assert!(text.contains("Subject: Hi"));
        assert!(text.contains("body"));
        assert!(composed.skipped_images.is_empty());
    }

    #[test]
    fn unreadable_image_is_skipped() {
        let mail = OutgoingMail::to("a@example.com")
            .body("see attached")
            .image("/definitely/not/here/ghost.png");
        let composed = build_message("me@example.com", &mail).unwrap();

        assert_eq!(
            composed.skipped_images,
            vec![PathBuf::from("/definitely/not/here/ghost.png")]
        );
        assert!(!formatted(&composed.message).contains("ghost.png"));
    }

    #[test]
    fn readable_image_is_attached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();

        let mail = OutgoingMail::to("a@example.com").body("see attached").image(&path);
        let composed = build_message("me@example.com", &mail).unwrap();

        let text = formatted(&composed.message);
        assert!(composed.skipped_images.is_empty());
        assert!(text.contains("multipart/mixed"));
        assert!(text.contains("image/png"));
        assert!(text.contains("dot.png"));
    }

    #[test]
    fn bad_recipient_is_rejected() {
        let mail = OutgoingMail::to("not an address");
        assert!(matches!(
            build_message("me@example.com", &mail),
            Err(MailError::InvalidAddress(_))
        ));
    }
}
