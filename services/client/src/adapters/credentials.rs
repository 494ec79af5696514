//! services/client/src/adapters/credentials.rs
//!
//! Implementations of the `CredentialStore` port: a JSON file that survives
//! restarts, and a process-local in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use trustme_core::{BearerToken, CredentialStore, PortError, PortResult, RefreshToken};

/// The fixed key the bearer token is persisted under.
pub const TOKEN_KEY: &str = "trustme.access_token";
/// The fixed key the refresh token is persisted under.
pub const REFRESH_TOKEN_KEY: &str = "trustme.refresh_token";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(rename = "trustme.access_token", default, skip_serializing_if = "Option::is_none")]
    access_token: Option<Stored<BearerToken>>,
    #[serde(rename = "trustme.refresh_token", default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<Stored<RefreshToken>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stored<T> {
    token: T,
    saved_at: DateTime<Utc>,
}

impl<T> Stored<T> {
    fn now(token: T) -> Self {
        Self {
            token,
            saved_at: Utc::now(),
        }
    }
}

//=========================================================================================
// File-backed Store
//=========================================================================================

/// Persists the bearer and refresh tokens as JSON at `path`.
///
/// The file is read lazily on first access and cached afterwards; every write
/// replaces the whole file (last write wins).
pub struct FileCredentialStore {
    path: PathBuf,
    cache: RwLock<Option<CredentialFile>>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    async fn read_file(&self) -> PortResult<CredentialFile> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CredentialFile::default()),
            Err(e) => return Err(storage_error(&self.path, e)),
        };
        serde_json::from_str(&raw)
            .map_err(|e| PortError::Storage(format!("{} is not valid: {}", self.path.display(), e)))
    }

    async fn write_file(&self, file: &CredentialFile) -> PortResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(parent, e))?;
        }

        let json = serde_json::to_string_pretty(file)
            .map_err(|e| PortError::Storage(e.to_string()))?;

        // Write next to the target, then swap it in.
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, json)
            .await
            .map_err(|e| storage_error(&staging, e))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| storage_error(&self.path, e))
    }

    /// The current file contents, read once per store.
    async fn contents(&self) -> PortResult<CredentialFile> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref() {
            return Ok(cached.clone());
        }
        let file = self.read_file().await?;
        debug!(
            path = %self.path.display(),
            access = file.access_token.is_some(),
            refresh = file.refresh_token.is_some(),
            "Loaded credential file."
        );
        *cache = Some(file.clone());
        Ok(file)
    }

    /// Applies `change` to the current contents and writes the result.
    /// An unreadable file is replaced.
    async fn update(&self, change: impl FnOnce(&mut CredentialFile)) -> PortResult<()> {
        let mut cache = self.cache.write().await;
        let mut file = match cache.as_ref() {
            Some(cached) => cached.clone(),
            None => self.read_file().await.unwrap_or_else(|e| {
                warn!("Overwriting unreadable credential file: {}", e);
                CredentialFile::default()
            }),
        };
        change(&mut file);
        self.write_file(&file).await?;
        *cache = Some(file);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> PortResult<Option<BearerToken>> {
        Ok(self.contents().await?.access_token.map(|stored| stored.token))
    }

    async fn store(&self, token: BearerToken) -> PortResult<()> {
        self.update(|file| file.access_token = Some(Stored::now(token)))
            .await?;
        info!(path = %self.path.display(), key = TOKEN_KEY, "Stored bearer token.");
        Ok(())
    }

    async fn clear(&self) -> PortResult<()> {
        let mut cache = self.cache.write().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(storage_error(&self.path, e)),
        }
        *cache = Some(CredentialFile::default());
        info!(path = %self.path.display(), "Cleared stored tokens.");
        Ok(())
    }

    async fn load_refresh_token(&self) -> PortResult<Option<RefreshToken>> {
        Ok(self.contents().await?.refresh_token.map(|stored| stored.token))
    }

    async fn store_refresh_token(&self, token: RefreshToken) -> PortResult<()> {
        self.update(|file| file.refresh_token = Some(Stored::now(token)))
            .await?;
        info!(path = %self.path.display(), key = REFRESH_TOKEN_KEY, "Stored refresh token.");
        Ok(())
    }

    async fn forget_refresh_token(&self) -> PortResult<()> {
        self.update(|file| file.refresh_token = None).await?;
        debug!(path = %self.path.display(), "Dropped refresh token.");
        Ok(())
    }
}

fn storage_error(path: &Path, e: std::io::Error) -> PortError {
    PortError::Storage(format!("{}: {}", path.display(), e))
}

//=========================================================================================
// In-memory Store
//=========================================================================================

/// Keeps the tokens for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<BearerToken>>,
    refresh_token: RwLock<Option<RefreshToken>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> PortResult<Option<BearerToken>> {
        Ok(self.token.read().await.clone())
    }

    async fn store(&self, token: BearerToken) -> PortResult<()> {
        *self.token.write().await = Some(token);
        Ok(())
    }

    async fn clear(&self) -> PortResult<()> {
        *self.token.write().await = None;
        *self.refresh_token.write().await = None;
        Ok(())
    }

    async fn load_refresh_token(&self) -> PortResult<Option<RefreshToken>> {
        Ok(self.refresh_token.read().await.clone())
    }

    async fn store_refresh_token(&self, token: RefreshToken) -> PortResult<()> {
        *self.refresh_token.write().await = Some(token);
        Ok(())
    }

    async fn forget_refresh_token(&self) -> PortResult<()> {
        *self.refresh_token.write().await = None;
        Ok(())
    }
}
