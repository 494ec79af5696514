//! services/client/src/adapters/mock_auth.rs
//!
//! A stand-in login provider for local use. It never talks to an identity
//! provider and never produces a bearer token; it only establishes a display name.

use async_trait::async_trait;
use std::time::Duration;
use trustme_core::{AuthProvider, Credential, PortError, PortResult};

/// Simulated round trip of the fake login.
pub const MOCK_LOGIN_DELAY: Duration = Duration::from_millis(600);

#[derive(Clone, Debug)]
pub struct MockAuthAdapter {
    provider: String,
    delay: Duration,
}

impl MockAuthAdapter {
    /// `provider` is the label of the button the user "clicked", e.g.
    /// `Google`, `Microsoft` or `guest`.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            delay: MOCK_LOGIN_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn display_name(&self) -> String {
        if self.provider.eq_ignore_ascii_case("guest") {
            "Guest".to_string()
        } else {
            self.provider.clone()
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuthAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn acquire_silent(&self) -> PortResult<Credential> {
        Err(PortError::Auth("the mock provider keeps no session".to_string()))
    }

    async fn acquire_interactive(&self) -> PortResult<Credential> {
        tokio::time::sleep(self.delay).await;
        Ok(Credential {
            display_name: self.display_name(),
            token: None,
        })
    }
}
