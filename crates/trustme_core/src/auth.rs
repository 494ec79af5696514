//! crates/trustme_core/src/auth.rs
//!
//! Login policy shared by every `AuthProvider`: try the silent flow, fall back
//! to the interactive one, persist whatever token comes out and remember who
//! logged in.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::domain::Identity;
use crate::ports::{AuthProvider, CredentialStore, PortError, PortResult};

pub struct Authenticator {
    provider: Arc<dyn AuthProvider>,
    credentials: Arc<dyn CredentialStore>,
    identity: RwLock<Identity>,
}

impl Authenticator {
    pub fn new(provider: Arc<dyn AuthProvider>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            provider,
            credentials,
            identity: RwLock::new(Identity::default()),
        }
    }

    pub async fn identity(&self) -> Identity {
        self.identity.read().await.clone()
    }

    /// Acquires a credential, silently if possible.
    ///
    /// On total failure the identity is reset to unauthenticated and a
    /// `PortError::Auth` is returned. A token that cannot be persisted also
    /// leaves the user unauthenticated. There is no retry.
    pub async fn login(&self) -> PortResult<Identity> {
        let provider = self.provider.name();

        let credential = match self.provider.acquire_silent().await {
            Ok(credential) => credential,
            Err(silent_err) => {
                warn!(provider, "Silent login failed, falling back to interactive: {}", silent_err);
                match self.provider.acquire_interactive().await {
                    Ok(credential) => credential,
                    Err(e) => {
                        error!(provider, "Interactive login failed: {}", e);
                        *self.identity.write().await = Identity::default();
                        return Err(match e {
                            PortError::Auth(message) => PortError::Auth(message),
                            other => PortError::Auth(other.to_string()),
                        });
                    }
                }
            }
        };

        if let Some(token) = credential.token {
            if let Err(e) = self.credentials.store(token).await {
                error!(provider, "Could not persist the bearer token: {}", e);
                *self.identity.write().await = Identity::default();
                return Err(e);
            }
        }

        let identity = Identity {
            display_name: Some(credential.display_name),
            is_authenticated: true,
        };
        *self.identity.write().await = identity.clone();
        info!(provider, user = ?identity.display_name, "Login succeeded.");
        Ok(identity)
    }

    /// Drops the stored token and forgets the identity.
    pub async fn logout(&self) -> PortResult<()> {
        self.credentials.clear().await?;
        *self.identity.write().await = Identity::default();
        info!("Logged out.");
        Ok(())
    }
}
