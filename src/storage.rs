//! Private-Key Storage
//!
//! Key stores map an account name to its private JWK. Account names are
//! validated against the GitHub handle pattern before any filesystem or map
//! access; a name that fails validation never touches storage.

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use regex::Regex;

use crate::crypto::PrivateJwk;
use crate::error::{Error, Result};

/// Directory name under the user's home for all agentcred data.
const AGENTCRED_DIR_NAME: &str = ".agentcred";

/// Subdirectory holding one `<account>.jwk` file per identity.
const KEYS_DIR_NAME: &str = "keys";

const KEY_FILE_EXT: &str = "jwk";

/// GitHub-compatible handle: alphanumeric with interior hyphens, max 39.
const ACCOUNT_NAME_PATTERN: &str = "^[A-Za-z0-9]([A-Za-z0-9-]{0,37}[A-Za-z0-9])?$";

fn account_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ACCOUNT_NAME_PATTERN).expect("account name pattern compiles"))
}

/// Reject anything that is not a well-formed account handle.
///
/// This runs before storage is touched, so traversal strings, empty names,
/// and over-length names never reach a path join.
pub fn validate_account_name(name: &str) -> Result<()> {
    if account_name_regex().is_match(name) {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid account name: {name:?}")))
    }
}

/// Persistence for private keys, keyed by account name.
pub trait KeyStore: Send + Sync {
    fn save(&self, account: &str, private_key: &PrivateJwk) -> Result<()>;
    /// `Ok(None)` for a well-formed but unknown name.
    fn load(&self, account: &str) -> Result<Option<PrivateJwk>>;
    fn list(&self) -> Result<Vec<String>>;
}

// ─── In-Memory Store ─────────────────────────────────────────────

/// Map-backed store for tests and ephemeral runtimes. No persistence.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, PrivateJwk>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn keys(&self) -> std::sync::MutexGuard<'_, HashMap<String, PrivateJwk>> {
        self.keys.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyStore for MemoryKeyStore {
    fn save(&self, account: &str, private_key: &PrivateJwk) -> Result<()> {
        validate_account_name(account)?;
        self.keys().insert(account.to_string(), private_key.clone());
        Ok(())
    }

    fn load(&self, account: &str) -> Result<Option<PrivateJwk>> {
        validate_account_name(account)?;
        Ok(self.keys().get(account).cloned())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.keys().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

// ─── Filesystem Store ────────────────────────────────────────────

/// Filesystem store: one `<account>.jwk` file per identity under a key
/// directory created with owner-only permissions.
///
/// No inter-process locking; concurrent writers for the same account are the
/// caller's problem. Fine for a single-user client.
pub struct FsKeyStore {
    key_dir: PathBuf,
}

impl FsKeyStore {
    pub fn new(key_dir: impl Into<PathBuf>) -> Self {
        Self {
            key_dir: key_dir.into(),
        }
    }

    /// Store under `$AGENTCRED_HOME/keys` or `~/.agentcred/keys`.
    pub fn open_default() -> Self {
        Self::new(default_key_dir())
    }

    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    /// Path for an already-validated account name, re-checked for
    /// containment within the key directory.
    fn key_path(&self, account: &str) -> Result<PathBuf> {
        let path = self.key_dir.join(format!("{account}.{KEY_FILE_EXT}"));
        // The regex excludes separators, but keep the containment check as
        // a second line of defense.
        if !path.starts_with(&self.key_dir) {
            return Err(Error::Validation(format!(
                "key path escapes key directory: {}",
                path.display()
            )));
        }
        Ok(path)
    }

    fn ensure_key_dir(&self) -> Result<()> {
        if !self.key_dir.exists() {
            fs::create_dir_all(&self.key_dir)?;
            fs::set_permissions(&self.key_dir, fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }
}

impl KeyStore for FsKeyStore {
    fn save(&self, account: &str, private_key: &PrivateJwk) -> Result<()> {
        validate_account_name(account)?;
        let path = self.key_path(account)?;
        self.ensure_key_dir()?;

        let json = serde_json::to_string_pretty(private_key)?;
        fs::write(&path, json)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;

        tracing::debug!(account, path = %path.display(), "saved private key");
        Ok(())
    }

    fn load(&self, account: &str) -> Result<Option<PrivateJwk>> {
        validate_account_name(account)?;
        let path = self.key_path(account)?;
        if !path.exists() {
            return Ok(None);
        }

        // An unreadable or corrupt key file reads as absent.
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Ok(None),
        };
        Ok(serde_json::from_str(&contents).ok())
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.key_dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(Vec::new()),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                if path.extension().and_then(|e| e.to_str()) != Some(KEY_FILE_EXT) {
                    return None;
                }
                path.file_stem().and_then(|s| s.to_str()).map(String::from)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Base agentcred directory: `$AGENTCRED_HOME` or `~/.agentcred`.
pub fn agentcred_dir() -> PathBuf {
    match std::env::var("AGENTCRED_HOME") {
        Ok(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
            home.join(AGENTCRED_DIR_NAME)
        }
    }
}

/// Default key directory under the agentcred directory.
pub fn default_key_dir() -> PathBuf {
    agentcred_dir().join(KEYS_DIR_NAME)
}
