//! Dropbox API client for shared link creation.

use reqwest::Client;
use url::Url;

use crate::error::{LinkError, Result};
use crate::models::{
    ApiErrorResponse, CreateSharedLinkRequest, PendingUpload, SharedLinkResponse,
};

/// Base URL for Dropbox API v2.
const API_BASE: &str = "https://api.dropboxapi.com/2";

/// Client for the Dropbox sharing API.
///
/// Holds a fixed access token; cheap to share by reference across concurrent requests.
pub struct DropboxClient {
    access_token: String,
    api_base: String,
    http: Client,
}

impl DropboxClient {
    /// Create a new DropboxClient.
    ///
    /// # Arguments
    /// * `access_token` - A fresh OAuth2 access token
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            api_base: API_BASE.to_string(),
            http: Client::new(),
        }
    }

    /// Point the client at a different API base (e.g. a local mock server).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Create (or fetch the existing) shared link for a Dropbox path.
    ///
    /// # Arguments
    /// * `remote_path` - Path relative to the Dropbox root, starting with `/`
    /// * `pending_upload` - Lets Dropbox create the link while the item is still syncing
    pub async fn create_shared_link(
        &self,
        remote_path: &str,
        pending_upload: PendingUpload,
    ) -> Result<Url> {
        let body = CreateSharedLinkRequest {
            path: remote_path,
            short_url: false,
            pending_upload,
        };

        let response = self
            .http
            .post(format!("{}/sharing/create_shared_link", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
                return Err(LinkError::ApiError {
                    status: status.as_u16(),
                    message: api_error.error_summary,
                });
            }
            return Err(LinkError::ApiError {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let link: SharedLinkResponse = response.json().await?;
        Ok(Url::parse(&link.url)?)
    }
}
