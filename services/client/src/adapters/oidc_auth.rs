//! services/client/src/adapters/oidc_auth.rs
//!
//! This module contains the adapter for a real OpenID Connect identity provider.
//! It implements the `AuthProvider` port from the `core` crate:
//! - silent login exchanges the refresh token kept in the credential store,
//! - interactive login runs the OAuth 2.0 device authorization grant, asking
//!   the user to confirm a code in their browser.
//! The access token is requested for the backend's API identifier (`audience`).

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use trustme_core::{
    AuthProvider, BearerToken, Credential, CredentialStore, PortError, PortResult, RefreshToken,
};

use crate::config::OidcConfig;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);
const FALLBACK_DISPLAY_NAME: &str = "Signed-in user";

//=========================================================================================
// Wire Types
//=========================================================================================

/// What the user needs to finish an interactive login.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// The claims used to name the user.
#[derive(Debug, Deserialize)]
struct IdClaims {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    sub: Option<String>,
}

enum TokenPoll {
    Granted(TokenResponse),
    Pending,
    SlowDown,
}

type PromptFn = dyn Fn(&DeviceAuthorization) + Send + Sync;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct OidcAuthAdapter {
    client: Client,
    config: OidcConfig,
    credentials: Arc<dyn CredentialStore>,
    /// Display name of the last grant, reused when a refresh carries no ID token.
    display_name: RwLock<Option<String>>,
    poll_interval: Option<Duration>,
    prompt: Arc<PromptFn>,
}

impl OidcAuthAdapter {
    /// Creates a new `OidcAuthAdapter`. Refresh tokens are kept in
    /// `credentials`, so a later process can log in silently. The device prompt
    /// is only logged until `with_prompt` installs something the user can
    /// actually see.
    pub fn new(client: Client, config: OidcConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            config,
            credentials,
            display_name: RwLock::new(None),
            poll_interval: None,
            prompt: Arc::new(|device: &DeviceAuthorization| {
                info!(
                    verification_uri = %device.verification_uri,
                    user_code = %device.user_code,
                    "Confirm the login in your browser."
                );
            }),
        }
    }

    pub fn with_prompt<F>(mut self, prompt: F) -> Self
    where
        F: Fn(&DeviceAuthorization) + Send + Sync + 'static,
    {
        self.prompt = Arc::new(prompt);
        self
    }

    /// Overrides the polling interval suggested by the provider.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    fn token_url(&self) -> String {
        format!("{}/oauth/token", self.config.issuer)
    }

    async fn start_device_authorization(&self) -> PortResult<DeviceAuthorization> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("scope", self.config.scope.as_str()),
            ("audience", self.config.audience.as_str()),
        ];

        let response = self
            .client
            .post(format!("{}/oauth/device/code", self.config.issuer))
            .form(&params)
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PortError::Auth(format!(
                "device authorization failed ({}): {}",
                status, error_text
            )));
        }

        response
            .json::<DeviceAuthorization>()
            .await
            .map_err(|e| PortError::Auth(format!("invalid device authorization response: {}", e)))
    }

    /// One call to the token endpoint, classifying the OAuth error codes the
    /// polling loop cares about.
    async fn request_token(&self, params: &[(&str, &str)]) -> PortResult<TokenPoll> {
        let response = self
            .client
            .post(self.token_url())
            .form(params)
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<TokenResponse>()
                .await
                .map(TokenPoll::Granted)
                .map_err(|e| PortError::Auth(format!("invalid token response: {}", e)));
        }

        let error = response
            .json::<TokenErrorResponse>()
            .await
            .map_err(|_| PortError::Api {
                status: status.as_u16(),
            })?;
        match error.error.as_str() {
            "authorization_pending" => Ok(TokenPoll::Pending),
            "slow_down" => Ok(TokenPoll::SlowDown),
            other => Err(PortError::Auth(match error.error_description {
                Some(description) => format!("{}: {}", other, description),
                None => other.to_string(),
            })),
        }
    }

    /// Turns a granted token into a credential and persists a rotated
    /// refresh token.
    async fn accept(&self, tokens: TokenResponse) -> PortResult<Credential> {
        if let Some(refresh_token) = tokens.refresh_token {
            self.credentials
                .store_refresh_token(RefreshToken::new(refresh_token))
                .await?;
        }

        let mut cached_name = self.display_name.write().await;
        let display_name = tokens
            .id_token
            .as_deref()
            .and_then(display_name_from_id_token)
            .or_else(|| cached_name.clone())
            .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_string());
        *cached_name = Some(display_name.clone());

        Ok(Credential {
            display_name,
            token: Some(BearerToken::new(tokens.access_token)),
        })
    }

    /// Polling cadence: an explicit override wins, otherwise the provider's
    /// suggestion, never faster than once a second.
    fn poll_interval(&self, device: &DeviceAuthorization) -> Duration {
        self.poll_interval.unwrap_or_else(|| {
            Duration::from_secs(device.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS))
                .max(MIN_POLL_INTERVAL)
        })
    }
}

//=========================================================================================
// `AuthProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthProvider for OidcAuthAdapter {
    fn name(&self) -> &str {
        "oidc"
    }

    async fn acquire_silent(&self) -> PortResult<Credential> {
        let refresh_token = self
            .credentials
            .load_refresh_token()
            .await?
            .ok_or_else(|| PortError::Auth("no refresh token available".to_string()))?;

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("scope", self.config.scope.as_str()),
        ];
        match self.request_token(&params).await {
            Ok(TokenPoll::Granted(tokens)) => self.accept(tokens).await,
            Ok(_) => Err(PortError::Auth("refresh token grant is pending".to_string())),
            Err(e @ PortError::Auth(_)) => {
                warn!("Refresh token rejected, dropping it: {}", e);
                self.credentials.forget_refresh_token().await?;
                Err(e)
            }
            Err(e) => {
                warn!("Refresh token grant failed, keeping the token: {}", e);
                Err(e)
            }
        }
    }

    async fn acquire_interactive(&self) -> PortResult<Credential> {
        let device = self.start_device_authorization().await?;
        (self.prompt)(&device);

        let deadline = device_deadline(Instant::now(), &device)?;
        let mut interval = self.poll_interval(&device);
        let params = [
            ("grant_type", DEVICE_CODE_GRANT),
            ("device_code", device.device_code.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ];

        loop {
            tokio::time::sleep(interval).await;
            if Instant::now() >= deadline {
                return Err(PortError::Auth("the device code expired".to_string()));
            }

            match self.request_token(&params).await? {
                TokenPoll::Granted(tokens) => return self.accept(tokens).await,
                TokenPoll::Pending => debug!("Authorization pending."),
                TokenPoll::SlowDown => {
                    interval += SLOW_DOWN_STEP;
                    debug!(?interval, "Provider asked to slow down.");
                }
            }
        }
    }
}

/// When the device code stops being redeemable.
fn device_deadline(now: Instant, device: &DeviceAuthorization) -> PortResult<Instant> {
    now.checked_add(Duration::from_secs(device.expires_in))
        .ok_or_else(|| {
            PortError::Auth(format!(
                "device code lifetime out of range: {}s",
                device.expires_in
            ))
        })
}

/// Reads a human name out of an ID token without verifying it; the token only
/// labels the UI and is never used for authorization decisions.
fn display_name_from_id_token(id_token: &str) -> Option<String> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let key = DecodingKey::from_secret(b"unused");
    let claims = decode::<IdClaims>(id_token, &key, &validation).ok()?.claims;

    [
        claims.name,
        claims.nickname,
        claims.preferred_username,
        claims.email,
        claims.sub,
    ]
    .into_iter()
    .flatten()
    .find(|candidate| !candidate.trim().is_empty())
}
