//! Persisted credential record: loading, saving and first-run app identity.

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::console::Console;
use crate::error::{LinkError, Result};
use crate::models::{AccountKind, Credentials};

/// File name of the credential record in the user's home directory.
pub const CONFIG_FILE_NAME: &str = ".get_dropbox_link_conf.json";

/// Dropbox app keys are ASCII alphanumeric strings of at least 10 characters.
static APP_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{10,}$").expect("Invalid app key regex"));

/// Whether `key` looks like a Dropbox app key (not an OAuth2 token).
pub fn is_plausible_app_key(key: &str) -> bool {
    APP_KEY_REGEX.is_match(key)
}

/// Reads and writes the credential record at a fixed location.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Store at `~/.get_dropbox_link_conf.json`.
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            LinkError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "home directory not found",
            ))
        })?;
        Ok(Self::new(home.join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record. A missing or malformed file yields empty credentials.
    pub fn load(&self) -> Credentials {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No credentials at {}: {}", self.path.display(), e);
                return Credentials::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(
                    "Ignoring unreadable credentials file {}: {}",
                    self.path.display(),
                    e
                );
                Credentials::default()
            }
        }
    }

    /// Overwrite the file with `credentials`, creating it if absent.
    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        let json = serde_json::to_string_pretty(credentials)?;
        fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        info!("Saved credentials to {}", self.path.display());
        Ok(())
    }

    /// Prompt for the app key and account kind if either is unset, then save once.
    ///
    /// Returns `true` if the record was updated and saved.
    pub fn ensure_app_identity<R: BufRead, W: Write>(
        &self,
        credentials: &mut Credentials,
        console: &mut Console<R, W>,
    ) -> Result<bool> {
        if credentials.has_app_identity() {
            return Ok(false);
        }

        console.say("Dropbox app identity not configured yet.")?;
        console.say("Find your app's key in the Dropbox App Console (it is not an OAuth2 token).")?;

        let app_key = loop {
            let Some(answer) = console.prompt("App key: ")? else {
                return Err(LinkError::AppIdentityMissing(
                    "input closed before an app key was entered".to_string(),
                ));
            };
            if is_plausible_app_key(&answer) {
                break answer;
            }
            console.say("That doesn't look like an app key, try again.")?;
        };

        let account_kind = loop {
            let Some(answer) = console.prompt("Account type (personal/business): ")? else {
                return Err(LinkError::AppIdentityMissing(
                    "input closed before an account type was entered".to_string(),
                ));
            };
            if let Some(kind) = AccountKind::from_token(&answer) {
                break kind;
            }
            console.say("Please answer 'personal' or 'business'.")?;
        };

        credentials.app_key = Some(app_key);
        credentials.account_kind = Some(account_kind);
        self.save(credentials)?;
        Ok(true)
    }
}
