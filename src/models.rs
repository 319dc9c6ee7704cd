//! Data models for the credential file, Dropbox API payloads and the local `info.json`.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Kind of Dropbox account the app key was registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Personal,
    Business,
}

impl AccountKind {
    /// Name used in the credential file and as the key in Dropbox's `info.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Personal => "personal",
            AccountKind::Business => "business",
        }
    }

    /// Parse a user-typed token such as `personal`, `Business` or `b`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "personal" | "p" => Some(AccountKind::Personal),
            "business" | "b" => Some(AccountKind::Business),
            _ => None,
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted credential record.
///
/// `access_token` and `access_token_expiry` only ever change together, through
/// [`Credentials::update_access_token`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_key: Option<String>,
    #[serde(default, rename = "account_type", skip_serializing_if = "Option::is_none")]
    pub account_kind: Option<AccountKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(
        default,
        rename = "access_token_expiration",
        deserialize_with = "deserialize_expiry"
    )]
    pub access_token_expiry: DateTime<Utc>,
}

impl Credentials {
    /// Whether both the app key and the account kind are filled in.
    pub fn has_app_identity(&self) -> bool {
        self.app_key.as_deref().is_some_and(|k| !k.is_empty()) && self.account_kind.is_some()
    }

    /// Replace the access token and its expiry. Returns `true` if either changed.
    pub fn update_access_token(&mut self, token: String, expiry: DateTime<Utc>) -> bool {
        if self.access_token.as_deref() == Some(token.as_str()) && self.access_token_expiry == expiry {
            return false;
        }
        self.access_token = Some(token);
        self.access_token_expiry = expiry;
        true
    }
}

fn deserialize_expiry<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) => parse_expiry(&s).map_err(serde::de::Error::custom),
        None => Ok(DateTime::<Utc>::default()),
    }
}

/// Parse an ISO-8601 expiry timestamp.
///
/// Timestamps without an offset are read as local time.
pub fn parse_expiry(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| format!("invalid timestamp {:?}: {}", s, e))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("timestamp {:?} does not exist in the local timezone", s))
}

/// OAuth2 token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Tells Dropbox the target may still be syncing from this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
pub enum PendingUpload {
    File,
    Folder,
}

/// Body of `sharing/create_shared_link`.
#[derive(Debug, Serialize)]
pub struct CreateSharedLinkRequest<'a> {
    pub path: &'a str,
    pub short_url: bool,
    pub pending_upload: PendingUpload,
}

/// Response of `sharing/create_shared_link`.
#[derive(Debug, Deserialize)]
pub struct SharedLinkResponse {
    pub url: String,
}

/// Dropbox API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error_summary: String,
}

/// One account entry of the desktop client's `info.json`.
#[derive(Debug, Deserialize)]
pub struct DropboxInfoEntry {
    pub path: PathBuf,
}

/// The desktop client's `info.json`, keyed by account kind name.
pub type DropboxInfo = HashMap<String, DropboxInfoEntry>;
