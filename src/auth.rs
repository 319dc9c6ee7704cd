//! OAuth2 (PKCE, offline access) authentication for the Dropbox API.

use std::io::{BufRead, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::console::Console;
use crate::credentials::CredentialStore;
use crate::error::{LinkError, Result};
use crate::models::{Credentials, TokenResponse};

/// Dropbox web host serving the authorization page.
const AUTHORIZE_BASE: &str = "https://www.dropbox.com";

/// Dropbox API host serving the token endpoint.
const API_BASE: &str = "https://api.dropboxapi.com";

/// Result of a completed authorization-code exchange.
#[derive(Debug, Clone)]
pub struct OAuthResult {
    pub refresh_token: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Access token minted from a refresh token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// An authorization flow in progress: the URL to visit and the PKCE verifier.
#[derive(Debug, Clone)]
pub struct AuthFlow {
    pub authorize_url: Url,
    code_verifier: String,
}

/// Client for the Dropbox OAuth2 endpoints.
#[derive(Clone)]
pub struct Authenticator {
    app_key: String,
    http: Client,
    authorize_base: String,
    api_base: String,
}

impl Authenticator {
    pub fn new(app_key: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            http: Client::new(),
            authorize_base: AUTHORIZE_BASE.to_string(),
            api_base: API_BASE.to_string(),
        }
    }

    /// Point the authenticator at different hosts.
    pub fn with_endpoints(mut self, authorize_base: &str, api_base: &str) -> Self {
        self.authorize_base = authorize_base.trim_end_matches('/').to_string();
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Begin a PKCE authorization flow.
    pub fn start_auth(&self) -> Result<AuthFlow> {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let code_verifier = URL_SAFE_NO_PAD.encode(bytes);
        let code_challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()));

        let authorize_url = Url::parse_with_params(
            &format!("{}/oauth2/authorize", self.authorize_base),
            &[
                ("client_id", self.app_key.as_str()),
                ("response_type", "code"),
                ("code_challenge", code_challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("token_access_type", "offline"),
            ],
        )?;

        Ok(AuthFlow {
            authorize_url,
            code_verifier,
        })
    }

    /// Exchange an authorization code for a refresh token and a first access token.
    pub async fn finish_auth(&self, flow: &AuthFlow, code: &str) -> Result<OAuthResult> {
        let params = [
            ("code", code),
            ("grant_type", "authorization_code"),
            ("client_id", self.app_key.as_str()),
            ("code_verifier", flow.code_verifier.as_str()),
        ];

        let token = self
            .request_token(&params)
            .await
            .map_err(|e| LinkError::AuthExchangeError(e.to_string()))?;

        let refresh_token = token.refresh_token.ok_or_else(|| {
            LinkError::AuthExchangeError("response did not include a refresh token".to_string())
        })?;

        let expires_at = expiry_from_now(token.expires_in).ok_or_else(|| {
            LinkError::AuthExchangeError(format!("expires_in {} out of range", token.expires_in))
        })?;

        Ok(OAuthResult {
            refresh_token,
            access_token: token.access_token,
            expires_at,
        })
    }

    /// Mint a new access token from a refresh token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<AccessToken> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.app_key.as_str()),
        ];

        let token = self
            .request_token(&params)
            .await
            .map_err(|e| LinkError::TokenRefreshError(e.to_string()))?;

        let expires_at = expiry_from_now(token.expires_in).ok_or_else(|| {
            LinkError::TokenRefreshError(format!("expires_in {} out of range", token.expires_in))
        })?;

        Ok(AccessToken {
            access_token: token.access_token,
            expires_at,
        })
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(format!("{}/oauth2/token", self.api_base))
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LinkError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.json().await?)
    }
}

/// `now + expires_in`, or `None` when the lifetime does not fit a timestamp.
fn expiry_from_now(expires_in: u64) -> Option<DateTime<Utc>> {
    i64::try_from(expires_in)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
}

/// Where a credential record stands in the token lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    NoRefreshToken,
    HasRefreshTokenNoAccessToken,
    HasValidAccessToken,
    HasExpiredAccessToken,
}

impl TokenState {
    /// Classify `credentials` at time `now`. An expiry equal to `now` is still valid.
    pub fn of(credentials: &Credentials, now: DateTime<Utc>) -> Self {
        if credentials.refresh_token.is_none() {
            return TokenState::NoRefreshToken;
        }
        match credentials.access_token {
            None => TokenState::HasRefreshTokenNoAccessToken,
            Some(_) if credentials.access_token_expiry < now => TokenState::HasExpiredAccessToken,
            Some(_) => TokenState::HasValidAccessToken,
        }
    }
}

/// Owns one credential record and keeps its tokens usable, saving on change.
pub struct TokenProvider {
    auth: Authenticator,
    store: CredentialStore,
    credentials: Credentials,
}

impl TokenProvider {
    pub fn new(auth: Authenticator, store: CredentialStore, credentials: Credentials) -> Self {
        Self {
            auth,
            store,
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn state(&self) -> TokenState {
        TokenState::of(&self.credentials, Utc::now())
    }

    /// Run the interactive authorization-code flow if no refresh token is cached.
    pub async fn acquire_refresh_token<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
    ) -> Result<()> {
        if self.credentials.refresh_token.is_some() {
            return Ok(());
        }

        let flow = self.auth.start_auth()?;
        let url = flow.authorize_url.as_str();

        console.open_url(url);
        console.say("Refresh token not found. Let's generate a new one.")?;
        console.say(&format!("1. Go to: {}", url))?;
        console.say("2. Click \"Allow\", etc. (You may need to log in first.)")?;
        console.say("3. Copy the authorization code.")?;

        let code = match console.prompt("Enter the authorization code here: ")? {
            Some(code) if !code.is_empty() => code,
            _ => {
                return Err(LinkError::AuthExchangeError(
                    "no authorization code entered".to_string(),
                ))
            }
        };

        let result = self.auth.finish_auth(&flow, &code).await?;
        self.credentials.refresh_token = Some(result.refresh_token);
        self.credentials
            .update_access_token(result.access_token, result.expires_at);
        self.store.save(&self.credentials)?;

        info!("Obtained a new refresh token");
        Ok(())
    }

    /// Return a usable access token, refreshing it at most once if missing or expired.
    pub async fn ensure_fresh_access_token(&mut self) -> Result<String> {
        match self.state() {
            TokenState::NoRefreshToken => Err(LinkError::TokenRefreshError(
                "no refresh token available".to_string(),
            )),
            TokenState::HasValidAccessToken => {
                debug!(
                    "Access token valid until {}",
                    self.credentials.access_token_expiry
                );
                self.current_access_token()
            }
            TokenState::HasRefreshTokenNoAccessToken | TokenState::HasExpiredAccessToken => {
                let refresh_token = self.credentials.refresh_token.clone().unwrap_or_default();
                let token = self.auth.refresh_access_token(&refresh_token).await?;

                if self
                    .credentials
                    .update_access_token(token.access_token, token.expires_at)
                {
                    self.store.save(&self.credentials)?;
                }

                info!(
                    "Refreshed access token, valid until {}",
                    self.credentials.access_token_expiry
                );
                self.current_access_token()
            }
        }
    }

    fn current_access_token(&self) -> Result<String> {
        self.credentials
            .access_token
            .clone()
            .ok_or_else(|| LinkError::TokenRefreshError("no access token available".to_string()))
    }
}
