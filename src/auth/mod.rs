//! Token storage (encrypted file-based)
//!
//! The backend issues two tokens at sign-in: the application access token
//! (`token`) and the WordPress token (`wpToken`). Both are kept encrypted
//! with AES-256-GCM in ~/.config/feedkit/credentials.enc and read again
//! before every authenticated call. The encryption key is derived from
//! machine-specific identifiers.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, Result};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

const NONCE_SIZE: usize = 12;

/// Storage key of the application access token
pub const ACCESS_TOKEN_KEY: &str = "token";

/// Storage key of the WordPress token
pub const WP_TOKEN_KEY: &str = "wpToken";

/// Tokens available for one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    /// Application access token (`Authorization: Bearer`)
    pub access: Option<String>,
    /// WordPress token (`X-WP-Token`)
    pub wp: Option<String>,
}

impl Tokens {
    /// Tokens with only an access token
    pub fn bearer(token: &str) -> Self {
        Self {
            access: Some(token.to_string()),
            wp: None,
        }
    }

    /// Whether neither token is present
    pub const fn is_empty(&self) -> bool {
        self.access.is_none() && self.wp.is_none()
    }
}

/// Where API clients get their tokens from
pub trait TokenSource: Send + Sync {
    /// Read the current tokens. Unreadable storage yields no tokens.
    fn tokens(&self) -> Tokens;
}

/// Fixed tokens, e.g. from the environment
#[derive(Debug, Clone, Default)]
pub struct StaticTokens(pub Tokens);

impl TokenSource for StaticTokens {
    fn tokens(&self) -> Tokens {
        self.0.clone()
    }
}

/// Normalize a stored access token.
///
/// Older app versions stored the token JSON-encoded (`"\"abc\""`). A JSON
/// string is unwrapped, any other JSON value is rejected and text that is
/// not JSON is used as-is.
pub fn unquote_token(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::String(token)) => Some(token).filter(|t| !t.is_empty()),
        Ok(_) => None,
        Err(_) => Some(raw.to_string()),
    }
}

/// Get machine ID for key derivation (cross-platform)
fn get_machine_id() -> String {
    // Linux: /etc/machine-id or /var/lib/dbus/machine-id
    #[cfg(target_os = "linux")]
    {
        if let Ok(id) = fs::read_to_string("/etc/machine-id") {
            return id.trim().to_string();
        }
        if let Ok(id) = fs::read_to_string("/var/lib/dbus/machine-id") {
            return id.trim().to_string();
        }
    }

    // macOS: IOPlatformUUID via ioreg
    #[cfg(target_os = "macos")]
    {
        if let Ok(output) = std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                if line.contains("IOPlatformUUID") {
                    if let Some(uuid) = line.split('"').nth(3) {
                        return uuid.to_string();
                    }
                }
            }
        }
    }

    dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "feedkit-fallback-key".to_string())
}

/// Derive encryption key from machine-specific data
fn derive_key() -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(get_machine_id().as_bytes());
    if let Some(home) = dirs::home_dir() {
        hasher.update(home.to_string_lossy().as_bytes());
    }
    hasher.update(b"feedkit-credentials-v1");
    hasher.finalize().into()
}

fn cipher() -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(&derive_key()).map_err(|_| anyhow::anyhow!("Invalid key length"))
}

/// Encrypted key/value file holding the tokens
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at the default location
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(paths::credentials_path()?))
    }

    /// Store at a specific file
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File backing this store
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all entries from the encrypted file
    fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let encrypted = fs::read(&self.path).context("Failed to read credentials file")?;
        if encrypted.len() < NONCE_SIZE {
            return Ok(HashMap::new());
        }

        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = cipher()?
            .decrypt(nonce, ciphertext)
            .map_err(|_| anyhow::anyhow!("Failed to decrypt credentials"))?;

        let json = String::from_utf8(plaintext).context("Invalid UTF-8 in credentials")?;
        let creds: HashMap<String, String> = serde_json::from_str(&json)?;

        Ok(creds)
    }

    /// Save all entries to the encrypted file
    fn save(&self, creds: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create credentials directory")?;
        }

        let json = serde_json::to_string(creds)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher()?
            .encrypt(nonce, json.as_bytes())
            .map_err(|_| anyhow::anyhow!("Failed to encrypt credentials"))?;

        let mut output = nonce_bytes.to_vec();
        output.extend(ciphertext);

        fs::write(&self.path, output).context("Failed to write credentials file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    /// Read one entry
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    /// Write one entry. Fails, leaving the file untouched, when the
    /// existing entries cannot be read.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut creds = self
            .load()
            .context("Refusing to overwrite unreadable credentials; run `feedkit logout` first")?;
        creds.insert(key.to_string(), value.to_string());
        self.save(&creds)
    }

    /// Remove one entry
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut creds = self.load()?;
        if creds.remove(key).is_some() {
            self.save(&creds)?;
        }
        Ok(())
    }

    /// Store the application access token
    pub fn store_access_token(&self, token: &str) -> Result<()> {
        self.set(ACCESS_TOKEN_KEY, token)
    }

    /// Store the WordPress token
    pub fn store_wp_token(&self, token: &str) -> Result<()> {
        self.set(WP_TOKEN_KEY, token)
    }

    /// Forget both tokens (sign out). An unreadable file is deleted.
    pub fn clear(&self) -> Result<()> {
        if let Err(e) = self.load() {
            tracing::warn!("Discarding unreadable credentials file: {e}");
            return fs::remove_file(&self.path).context("Failed to remove credentials file");
        }
        self.remove(ACCESS_TOKEN_KEY)?;
        self.remove(WP_TOKEN_KEY)
    }
}

impl TokenSource for CredentialStore {
    fn tokens(&self) -> Tokens {
        match self.load() {
            Ok(creds) => Tokens {
                access: creds.get(ACCESS_TOKEN_KEY).and_then(|t| unquote_token(t)),
                wp: creds
                    .get(WP_TOKEN_KEY)
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty()),
            },
            Err(e) => {
                tracing::warn!("Could not read stored tokens: {e}");
                Tokens::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_unquote_token() {
        assert_eq!(unquote_token("\"abc\"").as_deref(), Some("abc"));
        assert_eq!(unquote_token("abc.def").as_deref(), Some("abc.def"));
        assert_eq!(unquote_token("{\"a\":1}"), None);
        assert_eq!(unquote_token("  "), None);
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::at(dir.path().join("credentials.enc"));
        assert!(store.tokens().is_empty());

        store.store_access_token("\"app-jwt\"").unwrap();
        store.store_wp_token("wp-123").unwrap();

        let tokens = store.tokens();
        assert_eq!(tokens.access.as_deref(), Some("app-jwt"));
        assert_eq!(tokens.wp.as_deref(), Some("wp-123"));

        // On disk the file is not plaintext
        let raw = std::fs::read(store.path()).unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("wp-123"));
    }

    #[test]
    fn test_clear_removes_both() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::at(dir.path().join("credentials.enc"));
        store.store_access_token("a").unwrap();
        store.store_wp_token("b").unwrap();

        store.clear().unwrap();
        assert!(store.tokens().is_empty());
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_yields_no_tokens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        std::fs::write(&path, vec![7u8; 64]).unwrap();

        let store = CredentialStore::at(&path);
        assert!(store.tokens().is_empty());
        assert!(store.get(WP_TOKEN_KEY).is_err());
    }

    #[test]
    fn test_unreadable_file_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        std::fs::write(&path, vec![7u8; 64]).unwrap();

        let store = CredentialStore::at(&path);
        assert!(store.store_wp_token("wp-new").is_err());
        assert!(store.remove(ACCESS_TOKEN_KEY).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), vec![7u8; 64]);

        // Signing out discards it, after which writes work again
        store.clear().unwrap();
        assert!(!path.exists());
        store.store_wp_token("wp-new").unwrap();
        assert_eq!(store.tokens().wp.as_deref(), Some("wp-new"));
    }
}
