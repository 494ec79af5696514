//! services/client/src/adapters/http.rs
//!
//! This module contains the adapter for the remote trust-scoring service.
//! It implements the `AnalysisService` port from the `core` crate on top of `reqwest`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use trustme_core::{AnalysisRequest, AnalysisService, BearerToken, PortError, PortResult};

/// Payload of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnalysisService` with plain JSON over HTTP.
#[derive(Clone)]
pub struct HttpAnalysisAdapter {
    client: Client,
    base_url: String,
}

impl HttpAnalysisAdapter {
    /// Creates a new `HttpAnalysisAdapter`. `base_url` must not end with a slash.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Asks the service whether it is up and which version it runs.
    pub async fn health(&self) -> PortResult<HealthStatus> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::Api {
                status: response.status().as_u16(),
            });
        }

        response
            .json::<HealthStatus>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Invalid health payload: {}", e)))
    }
}

//=========================================================================================
// `AnalysisService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnalysisService for HttpAnalysisAdapter {
    /// Posts the request to `/analyze`.
    ///
    /// A non-2xx status becomes `PortError::Api` without reading the body. A
    /// 2xx body that is not JSON is handed on as a JSON string so it still
    /// renders as a diagnostic dump.
    async fn analyze(
        &self,
        request: &AnalysisRequest,
        token: Option<&BearerToken>,
    ) -> PortResult<Value> {
        let url = format!("{}/analyze", self.base_url);
        let mut builder = self.client.post(&url).json(request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token.as_str());
        }
        info!(url = %url, authenticated = token.is_some(), "Dispatching analysis request.");

        let response = builder
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Api {
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;
        debug!(status = status.as_u16(), body = %text, "Analysis response received.");

        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}
