use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use log::info;
use rand::RngCore;

const PASSWORD_FILE: &str = ".encrypted_password";
const KEY_FILE: &str = ".encryption_key";
const NONCE_LEN: usize = 12;

/// Account password kept on disk, AES-256-GCM encrypted under a locally
/// generated key.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    password_path: PathBuf,
    key_path: PathBuf,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

impl CredentialStore {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            password_path: dir.join(PASSWORD_FILE),
            key_path: dir.join(KEY_FILE),
        }
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        let key_bytes = if self.key_path.exists() {
            fs::read(&self.key_path)?
        } else {
            let mut key_bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut key_bytes);
            fs::write(&self.key_path, key_bytes)?;
            info!("Generated a new encryption key at {}", self.key_path.display());
            key_bytes.to_vec()
        };

        Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| anyhow::anyhow!("Failed to create cipher from key: {}", e))
    }

    pub fn encrypt(&self, password: &str) -> Result<String> {
        let cipher = self.cipher()?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, password.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to encrypt password: {}", e))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(&combined))
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<String> {
        let cipher = self.cipher()?;
        let combined = BASE64
            .decode(encrypted.trim())
            .map_err(|e| anyhow::anyhow!("Failed to decode base64: {}", e))?;
        if combined.len() <= NONCE_LEN {
            bail!("Encrypted password is truncated");
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| anyhow::anyhow!("Failed to decrypt password: {}", e))?;

        String::from_utf8(plaintext)
            .map_err(|e| anyhow::anyhow!("Failed to convert decrypted bytes to string: {}", e))
    }

    /// Stores `password`, replacing any previous one.
    pub fn store(&self, password: &str) -> Result<()> {
        let encrypted = self.encrypt(password)?;
        fs::write(&self.password_path, encrypted)?;
        Ok(())
    }

    /// Returns the stored password, prompting for it on first use.
    pub fn password(&self, login: &str) -> Result<String> {
        if self.password_path.exists() {
            let encrypted = fs::read_to_string(&self.password_path)?;
            return self.decrypt(&encrypted);
        }

        let password = rpassword::prompt_password(format!("Password for {}: ", login))?;
        self.store(&password)?;
        Ok(password)
    }
}
