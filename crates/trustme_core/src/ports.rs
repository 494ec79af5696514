//! crates/trustme_core/src/ports.rs
//!
//! Defines the service contracts (traits) the session controller depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the HTTP client, the token storage and the login flow.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{AnalysisRequest, BearerToken, Credential, RefreshToken};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// The `Display` output is what ends up in the user-visible error slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),
    /// The service answered with a non-2xx status. The body is not inspected.
    #[error("API error: {status}")]
    Api { status: u16 },
    /// Neither silent nor interactive login produced a credential.
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Credential storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Sends one analysis request and returns the raw JSON body of a 2xx answer.
    async fn analyze(
        &self,
        request: &AnalysisRequest,
        token: Option<&BearerToken>,
    ) -> PortResult<Value>;
}

/// Holds at most one bearer token and one refresh token. Writes are
/// last-write-wins.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> PortResult<Option<BearerToken>>;

    async fn store(&self, token: BearerToken) -> PortResult<()>;

    /// Forgets both tokens.
    async fn clear(&self) -> PortResult<()>;

    /// Stores without a refresh slot always report `None`.
    async fn load_refresh_token(&self) -> PortResult<Option<RefreshToken>> {
        Ok(None)
    }

    async fn store_refresh_token(&self, _token: RefreshToken) -> PortResult<()> {
        Ok(())
    }

    /// Drops the refresh token, keeping the bearer token.
    async fn forget_refresh_token(&self) -> PortResult<()> {
        Ok(())
    }
}

/// A login capability. Implementations decide what "silent" and
/// "interactive" mean for their identity provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Human readable provider name, used in logs.
    fn name(&self) -> &str;

    /// Tries to obtain a credential without user interaction.
    async fn acquire_silent(&self) -> PortResult<Credential>;

    /// Obtains a credential with user interaction.
    async fn acquire_interactive(&self) -> PortResult<Credential>;
}
