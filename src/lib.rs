//! get_dropbox_link - Turn paths inside your local Dropbox folder into share links.
//!
//! This library provides functionality to:
//! - Cache Dropbox OAuth2 credentials across runs, refreshing the access token when needed
//! - Resolve many local paths to shared links concurrently, in input order
//! - Rewrite links with query-string overrides and `+` for spaces
//!
//! # Example
//!
//! ```no_run
//! use get_dropbox_link::{DropboxClient, LinkResolver, QuerySpec};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = DropboxClient::new("access-token".to_string());
//!     let resolver = LinkResolver::new(&client, "/home/me/Dropbox")?
//!         .with_query(QuerySpec::parse("dl=1")?);
//!
//!     let paths = vec!["/home/me/Dropbox/docs/report.pdf".to_string()];
//!     for link in resolver.resolve_batch(&paths).await? {
//!         println!("{}", link.url);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod console;
pub mod credentials;
pub mod error;
pub mod models;
pub mod query;
pub mod resolver;

// Re-exports for convenience
pub use auth::{Authenticator, TokenProvider, TokenState};
pub use client::DropboxClient;
pub use console::Console;
pub use credentials::CredentialStore;
pub use error::{LinkError, Result};
pub use models::{AccountKind, Credentials};
pub use query::{apply_plus_for_space, QuerySpec};
pub use resolver::{locate_dropbox_folder, LinkResolver, ResolvedLink};
