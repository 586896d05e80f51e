use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use mailparse::{addrparse_header, parse_mail, DispositionType, MailAddr, MailHeaderMap, ParsedMail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use log::warn;

use crate::error::MailError;

/// One message read from the mailbox.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Bare sender address, display name dropped.
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    #[serde(serialize_with = "to_base64", deserialize_with = "from_base64")]
    pub content: Vec<u8>,
}

fn to_base64<S: Serializer>(content: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(content))
}

fn from_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    BASE64.decode(encoded).map_err(serde::de::Error::custom)
}

fn sender_address(parsed_mail: &ParsedMail) -> String {
    let Some(header) = parsed_mail.headers.get_first_header("From") else {
        return String::new();
    };

    match addrparse_header(header) {
        Ok(addresses) => addresses
            .iter()
            .find_map(|address| match address {
                MailAddr::Single(single) => Some(single.addr.clone()),
                MailAddr::Group(group) => group.addrs.first().map(|single| single.addr.clone()),
            })
            .unwrap_or_default(),
        Err(e) => {
            warn!("Unparsable From header {:?}: {}", header.get_value(), e);
            String::new()
        }
    }
}

fn attachment_filename(part: &ParsedMail) -> Option<String> {
    part.get_content_disposition()
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .filter(|name| !name.is_empty())
        .cloned()
}

// Walk every part depth first: the first inline text/plain part is the body,
// every named attachment is collected
fn collect_parts(
    part: &ParsedMail,
    body: &mut Option<String>,
    attachments: &mut Vec<Attachment>,
) -> Result<(), MailError> {
    let is_attachment = part.get_content_disposition().disposition == DispositionType::Attachment;

    if body.is_none() && !is_attachment && part.ctype.mimetype.eq_ignore_ascii_case("text/plain") {
        *body = Some(part.get_body().map_err(|e| MailError::Read(e.to_string()))?);
    }

    if is_attachment {
        if let Some(filename) = attachment_filename(part) {
            let content = part.get_body_raw().map_err(|e| MailError::Read(e.to_string()))?;
            attachments.push(Attachment { filename, content });
        }
    }

    for subpart in &part.subparts {
        collect_parts(subpart, body, attachments)?;
    }

    Ok(())
}

/// A fetched message with its headers parsed and its body still encoded.
pub struct Envelope<'a> {
    parsed_mail: ParsedMail<'a>,
    sender: String,
}

impl<'a> Envelope<'a> {
    /// Parses the header block of a fetched RFC 822 message. Bodies are not
    /// decoded until [`Envelope::into_message`].
    pub fn parse(raw: &'a [u8]) -> Result<Self, MailError> {
        let parsed_mail = parse_mail(raw).map_err(|e| MailError::Read(e.to_string()))?;
        let sender = sender_address(&parsed_mail);
        Ok(Self { parsed_mail, sender })
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Decodes the body and attachments.
    pub fn into_message(self) -> Result<InboundMessage, MailError> {
        let parsed_mail = self.parsed_mail;
        let subject = parsed_mail.headers.get_first_value("Subject").unwrap_or_default();

        let mut attachments = Vec::new();
        let body = if parsed_mail.ctype.mimetype.starts_with("multipart/") {
            let mut body = None;
            collect_parts(&parsed_mail, &mut body, &mut attachments)?;
            body.unwrap_or_default()
        } else {
            parsed_mail.get_body().map_err(|e| MailError::Read(e.to_string()))?
        };

        Ok(InboundMessage {
            sender: self.sender,
            subject,
            body,
            attachments,
        })
    }
}

/// Parses and decodes the raw RFC 822 source of a fetched message.
pub fn parse_message(raw: &[u8]) -> Result<InboundMessage, MailError> {
    Envelope::parse(raw)?.into_message()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = "From: \"Xavier Example\" <x@example.com>\n\
        To: me@example.com\n\
        Subject: Hello there\n\
        \n\
        Just a plain body.\n";

    const NAMED_BY_CONTENT_TYPE: &str = "From: y@example.com\n\
        Subject: Scan\n\
        MIME-Version: 1.0\n\
        Content-Type: multipart/mixed; boundary=\"XYZ\"\n\
        \n\
        --XYZ\n\
        Content-Type: text/html\n\
        \n\
        <p>not the body</p>\n\
        --XYZ\n\
        Content-Type: text/plain\n\
        \n\
        the body\n\
        --XYZ\n\
        Content-Type: image/jpeg; name=\"scan.jpg\"\n\
        Content-Disposition: attachment\n\
        Content-Transfer-Encoding: base64\n\
        \n\
        aGVsbG8=\n\
        --XYZ\n\
        Content-Type: text/plain\n\
        Content-Disposition: attachment\n\
        \n\
        nameless\n\
        --XYZ--\n";

    #[test]
    fn plain_message_keeps_address_only() {
        let message = parse_message(PLAIN.as_bytes()).unwrap();

        assert_eq!(message.sender, "x@example.com");
        assert_eq!(message.subject, "Hello there");
        assert_eq!(message.body.trim(), "Just a plain body.");
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn multipart_skips_html_and_nameless_attachments() {
        let message = parse_message(NAMED_BY_CONTENT_TYPE.as_bytes()).unwrap();

        assert_eq!(message.body.trim(), "the body");
        assert_eq!(
            message.attachments,
            vec![Attachment {
                filename: "scan.jpg".to_string(),
                content: b"hello".to_vec(),
            }]
        );
    }

    #[test]
    fn missing_headers_become_empty_strings() {
        let message = parse_message(b"To: me@example.com\n\nbody only\n").unwrap();

        assert_eq!(message.sender, "");
        assert_eq!(message.subject, "");
        assert_eq!(message.body.trim(), "body only");
    }

    #[test]
    fn envelope_defers_body_decoding() {
        let raw = b"From: Spam <spam@example.com>\n\
            Content-Transfer-Encoding: base64\n\
            \n\
            !!!not*base64***\n";

        let envelope = Envelope::parse(raw).unwrap();
        assert_eq!(envelope.sender(), "spam@example.com");
        assert!(matches!(envelope.into_message(), Err(MailError::Read(_))));
    }

    #[test]
    fn attachment_content_serializes_as_base64() {
        let attachment = Attachment {
            filename: "a.bin".to_string(),
            content: vec![0, 1, 2, 255],
        };

        let json = serde_json::to_value(&attachment).unwrap();
        assert_eq!(json["content"], "AAEC/w==");

        let back: Attachment = serde_json::from_value(json).unwrap();
        assert_eq!(back, attachment);
    }
}
