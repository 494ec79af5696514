//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;
use trustme_core::{Language, SessionSettings};

/// Used when no backend URL is configured anywhere.
pub const DEFAULT_BACKEND_URL: &str = "https://trustme-backend.azurewebsites.net";

const DEFAULT_CREDENTIALS_PATH: &str = "./.trustme/credentials.json";
const DEFAULT_OIDC_SCOPE: &str = "openid profile offline_access";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which login capability the client uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthProviderKind {
    None,
    Mock,
    Oidc,
}

impl FromStr for AuthProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(AuthProviderKind::None),
            "mock" => Ok(AuthProviderKind::Mock),
            "oidc" => Ok(AuthProviderKind::Oidc),
            other => Err(format!("'{}' is not one of none, mock, oidc", other)),
        }
    }
}

/// Settings for the device-code identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidcConfig {
    pub issuer: String,
    pub client_id: String,
    /// API identifier the access token is scoped to.
    pub audience: String,
    pub scope: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub backend_url: String,
    pub log_level: Level,
    pub session: SessionSettings,
    pub default_language: Language,
    /// `None` keeps the token in memory only.
    pub credentials_path: Option<PathBuf>,
    pub auth_provider: AuthProviderKind,
    pub mock_provider: String,
    pub oidc: Option<OidcConfig>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// `backend_override` is an injected URL (e.g. a command-line flag) that
    /// beats every environment source. The `.env` file is skipped in test
    /// builds to keep tests hermetic.
    pub fn from_env(backend_override: Option<String>) -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(backend_override, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(backend_override: Option<String>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Backend ---
        let backend_url = resolve_backend_url([
            backend_override,
            lookup("TRUSTME_BACKEND_URL"),
            lookup("BACKEND_URL"),
            lookup("BACKEND_PORT")
                .filter(|port| !port.trim().is_empty())
                .map(|port| format!("http://localhost:{}", port.trim())),
        ]);

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Session pacing ---
        let defaults = SessionSettings::default();
        let session = SessionSettings {
            settle_delay: millis(&lookup, "TRUSTME_SETTLE_DELAY_MS", defaults.settle_delay)?,
            reveal_delay: millis(&lookup, "TRUSTME_REVEAL_DELAY_MS", defaults.reveal_delay)?,
            settle_failures: flag(&lookup, "TRUSTME_SETTLE_FAILURES", defaults.settle_failures)?,
        };

        let default_language = match lookup("TRUSTME_LANGUAGE").filter(|v| !v.trim().is_empty()) {
            Some(tag) => tag.parse::<Language>().map_err(|e| {
                ConfigError::InvalidValue("TRUSTME_LANGUAGE".to_string(), e.to_string())
            })?,
            None => Language::default(),
        };

        // --- Credentials and login ---
        let credentials_path = match lookup("TRUSTME_CREDENTIALS_PATH") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(DEFAULT_CREDENTIALS_PATH)),
        };

        let auth_provider = lookup("TRUSTME_AUTH_PROVIDER")
            .unwrap_or_default()
            .parse::<AuthProviderKind>()
            .map_err(|e| ConfigError::InvalidValue("TRUSTME_AUTH_PROVIDER".to_string(), e))?;

        let mock_provider = lookup("TRUSTME_MOCK_PROVIDER")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "Guest".to_string());

        let oidc = if auth_provider == AuthProviderKind::Oidc {
            let required = |key: &str| {
                lookup(key)
                    .filter(|v| !v.trim().is_empty())
                    .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
            };
            Some(OidcConfig {
                issuer: required("TRUSTME_OIDC_ISSUER")?.trim_end_matches('/').to_string(),
                client_id: required("TRUSTME_OIDC_CLIENT_ID")?,
                audience: lookup("TRUSTME_OIDC_AUDIENCE")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| backend_url.clone()),
                scope: lookup("TRUSTME_OIDC_SCOPE")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_OIDC_SCOPE.to_string()),
            })
        } else {
            None
        };

        Ok(Self {
            backend_url,
            log_level,
            session,
            default_language,
            credentials_path,
            auth_provider,
            mock_provider,
            oidc,
        })
    }
}

/// Picks the first non-empty candidate, falling back to `DEFAULT_BACKEND_URL`.
/// Trailing slashes are removed so paths can be appended directly.
pub fn resolve_backend_url<I>(candidates: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .find(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

fn millis<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a boolean", v),
        )),
    }
}
