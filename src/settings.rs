use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use backtrace::Backtrace;
use log::error;

use crate::error::MailError;

pub const SETTINGS_PATH: &str = "src/resources/settings.yaml";

// Account and server endpoints for one mailbox
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MailSettings {
    pub email_address: String,
    #[serde(default = "default_imap_server")]
    pub imap_server: String,
    #[serde(default = "default_imap_port")]
    pub imap_port: u16,
    #[serde(default = "default_smtp_server")]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_allowed_emails_path")]
    pub allowed_emails_path: PathBuf,
    #[serde(default = "default_saved_emails_path")]
    pub saved_emails_path: PathBuf,
}

fn default_imap_server() -> String {
    "imap.gmail.com".to_string()
}

fn default_imap_port() -> u16 {
    993
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_allowed_emails_path() -> PathBuf {
    PathBuf::from("allowed_emails.json")
}

fn default_saved_emails_path() -> PathBuf {
    PathBuf::from("saved_emails.json")
}

impl MailSettings {
    /// Settings for `email_address` with the Gmail endpoints and list files
    /// in the working directory.
    pub fn new(email_address: impl Into<String>) -> Self {
        Self {
            email_address: email_address.into(),
            imap_server: default_imap_server(),
            imap_port: default_imap_port(),
            smtp_server: default_smtp_server(),
            smtp_port: default_smtp_port(),
            allowed_emails_path: default_allowed_emails_path(),
            saved_emails_path: default_saved_emails_path(),
        }
    }
}

fn settings_error(path: &Path, reason: String) -> MailError {
    error!("Error: {}", reason);

    // Capture and print the backtrace
    let backtrace = Backtrace::new();
    error!("Backtrace:\n{:?}", backtrace);
    MailError::Settings {
        path: path.to_path_buf(),
        reason,
    }
}

pub fn load_settings(path: impl AsRef<Path>) -> Result<MailSettings, MailError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| settings_error(path, err.to_string()))?;
    let reader = BufReader::new(file);

    // Parse the YAML file into the MailSettings struct
    serde_yaml::from_reader(reader).map_err(|err| settings_error(path, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn minimal_file_gets_gmail_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "email_address: me@example.com\n").unwrap();

        let settings = load_settings(&path).unwrap();

        assert_eq!(settings, MailSettings::new("me@example.com"));
        assert_eq!(settings.imap_server, "imap.gmail.com");
        assert_eq!(settings.imap_port, 993);
        assert_eq!(settings.smtp_server, "smtp.gmail.com");
        assert_eq!(settings.smtp_port, 587);
        assert_eq!(settings.allowed_emails_path, PathBuf::from("allowed_emails.json"));
        assert_eq!(settings.saved_emails_path, PathBuf::from("saved_emails.json"));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(
            &path,
            "email_address: me@example.com\nimap_server: imap.example.com\nsmtp_port: 465\nallowed_emails_path: lists/allowed.json\n",
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();

        assert_eq!(settings.imap_server, "imap.example.com");
        assert_eq!(settings.smtp_port, 465);
        assert_eq!(settings.allowed_emails_path, PathBuf::from("lists/allowed.json"));
        assert_eq!(settings.smtp_server, "smtp.gmail.com");
    }

    #[test]
    fn missing_file_is_a_settings_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_settings(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, MailError::Settings { .. }));
    }

    #[test]
    fn missing_address_is_a_settings_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "imap_port: 993\n").unwrap();

        assert!(matches!(load_settings(&path), Err(MailError::Settings { .. })));
    }
}
