//! Error types for the get_dropbox_link crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while resolving Dropbox share links.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Authorization failed: {0}")]
    AuthExchangeError(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshError(String),

    #[error("App identity not provided: {0}")]
    AppIdentityMissing(String),

    #[error("Couldn't find Dropbox folder path: {0}")]
    LocalRootLookupError(String),

    #[error("{path} is not inside the Dropbox folder {root}")]
    PathOutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Failed to resolve {path}: {source}")]
    PathResolveError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid query string: {0}")]
    QueryParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to encode credentials JSON: {0}")]
    CredentialsParseError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type alias for LinkError.
pub type Result<T> = std::result::Result<T, LinkError>;
