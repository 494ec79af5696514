//! services/client/src/state.rs
//!
//! Wires the adapters into the core services. Created once at startup and
//! shared by every command.

use std::sync::Arc;
use tracing::info;
use trustme_core::{AuthProvider, Authenticator, CredentialStore, SessionController};

use crate::adapters::{
    DeviceAuthorization, FileCredentialStore, HttpAnalysisAdapter, MemoryCredentialStore,
    MockAuthAdapter, OidcAuthAdapter,
};
use crate::config::{AuthProviderKind, Config};
use crate::error::ClientError;

/// The shared client state.
pub struct ClientState {
    pub config: Arc<Config>,
    pub backend: Arc<HttpAnalysisAdapter>,
    pub credentials: Arc<dyn CredentialStore>,
    pub session: Arc<SessionController>,
    /// `None` when no login provider is configured.
    pub authenticator: Option<Authenticator>,
}

impl ClientState {
    /// Builds every adapter from `config`. `oidc_prompt` customizes how the
    /// device code is shown to the user.
    pub fn build(
        config: Config,
        oidc_prompt: Option<Box<dyn Fn(&DeviceAuthorization) + Send + Sync>>,
    ) -> Result<Self, ClientError> {
        let config = Arc::new(config);
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("trustme-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let backend = Arc::new(HttpAnalysisAdapter::new(
            http_client.clone(),
            config.backend_url.clone(),
        ));

        let credentials: Arc<dyn CredentialStore> = match &config.credentials_path {
            Some(path) => Arc::new(FileCredentialStore::new(path.clone())),
            None => Arc::new(MemoryCredentialStore::new()),
        };

        let provider: Option<Arc<dyn AuthProvider>> = match config.auth_provider {
            AuthProviderKind::None => None,
            AuthProviderKind::Mock => Some(Arc::new(MockAuthAdapter::new(config.mock_provider.clone()))),
            AuthProviderKind::Oidc => {
                let oidc = config.oidc.clone().ok_or_else(|| {
                    ClientError::Internal("OIDC provider selected without OIDC settings".to_string())
                })?;
                let mut adapter = OidcAuthAdapter::new(http_client, oidc, credentials.clone());
                if let Some(prompt) = oidc_prompt {
                    adapter = adapter.with_prompt(prompt);
                }
                Some(Arc::new(adapter))
            }
        };
        let authenticator = provider.map(|p| Authenticator::new(p, credentials.clone()));

        let session = Arc::new(SessionController::new(
            backend.clone(),
            credentials.clone(),
            config.session.clone(),
        ));

        info!(
            backend = %config.backend_url,
            auth = ?config.auth_provider,
            settle_ms = config.session.settle_delay.as_millis() as u64,
            "Client state initialized."
        );

        Ok(Self {
            config,
            backend,
            credentials,
            session,
            authenticator,
        })
    }
}
