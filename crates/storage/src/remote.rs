//! Progress document stored in a remote hierarchical JSON database.
//!
//! Speaks the REST dialect of Firebase-style realtime databases: every node is
//! addressable as `{base}/{path}.json`, `GET` returns the node (or `null`),
//! `PUT` replaces it and `PATCH` merges the top-level keys of the body into it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use progress_core::{PartialUpdate, ProgressDocument};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::repository::{ProgressStore, StorageError};

pub const DEFAULT_DOCUMENT_KEY: &str = "progress";
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// How partial updates are applied remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteMergeMode {
    /// Send the partial update with `PATCH`; the remote store does the union.
    #[default]
    NativePatch,
    /// `GET`, union locally, `PUT` the whole document, under a local lock.
    /// For stores without an atomic partial-update primitive.
    ReadModifyWrite,
}

impl FromStr for RemoteMergeMode {
    type Err = RemoteConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patch" | "native" => Ok(Self::NativePatch),
            "read-modify-write" | "rmw" => Ok(Self::ReadModifyWrite),
            other => Err(RemoteConfigError::UnknownMergeMode(other.to_string())),
        }
    }
}

impl fmt::Display for RemoteMergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NativePatch => write!(f, "patch"),
            Self::ReadModifyWrite => write!(f, "read-modify-write"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RemoteConfigError {
    #[error("invalid remote base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("remote document key cannot be empty")]
    EmptyKey,
    #[error("unknown remote merge mode `{0}` (expected `patch` or `read-modify-write`)")]
    UnknownMergeMode(String),
}

#[derive(Clone)]
pub struct RemoteConfig {
    pub base_url: Url,
    pub key: String,
    pub auth: Option<String>,
    pub merge_mode: RemoteMergeMode,
    pub timeout: Duration,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url.as_str())
            .field("key", &self.key)
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .field("merge_mode", &self.merge_mode)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RemoteConfig {
    /// Validate the base URL and build a config with default key and mode.
    ///
    /// # Errors
    ///
    /// Returns `RemoteConfigError::InvalidBaseUrl` if the URL does not parse
    /// or is not http(s).
    pub fn new(base_url: &str) -> Result<Self, RemoteConfigError> {
        let parsed = Url::parse(base_url.trim())
            .map_err(|_| RemoteConfigError::InvalidBaseUrl(base_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RemoteConfigError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url: parsed,
            key: DEFAULT_DOCUMENT_KEY.to_string(),
            auth: None,
            merge_mode: RemoteMergeMode::default(),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        })
    }

    /// # Errors
    ///
    /// Returns `RemoteConfigError::EmptyKey` if the key is blank.
    pub fn with_key(mut self, key: impl Into<String>) -> Result<Self, RemoteConfigError> {
        let key = key.into();
        let key = key.trim().trim_matches('/');
        if key.is_empty() {
            return Err(RemoteConfigError::EmptyKey);
        }
        self.key = key.to_string();
        Ok(self)
    }

    #[must_use]
    pub fn with_auth(mut self, auth: Option<String>) -> Self {
        self.auth = auth.filter(|token| !token.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_merge_mode(mut self, mode: RemoteMergeMode) -> Self {
        self.merge_mode = mode;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn document_url(&self) -> String {
        format!(
            "{}/{}.json",
            self.base_url.as_str().trim_end_matches('/'),
            self.key
        )
    }
}

/// Progress store backed by a remote JSON document database.
pub struct RemoteProgressStore {
    client: Client,
    config: RemoteConfig,
    // Only taken in `ReadModifyWrite` mode.
    rmw_lock: Mutex<()>,
}

impl RemoteProgressStore {
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the HTTP client cannot be built.
    pub fn new(config: RemoteConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            config,
            rmw_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn request(&self, method: Method) -> RequestBuilder {
        let builder = self.client.request(method, self.config.document_url());
        match self.config.auth.as_deref() {
            Some(token) => builder.query(&[("auth", token)]),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StorageError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::RemoteStatus {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn fetch_value(&self) -> Result<Value, StorageError> {
        let response = self.send(self.request(Method::GET)).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn put_document(&self, document: &ProgressDocument) -> Result<(), StorageError> {
        self.send(self.request(Method::PUT).json(document))
            .await
            .map_err(write_error)?;
        Ok(())
    }
}

fn write_error(err: StorageError) -> StorageError {
    match err {
        StorageError::Connection(msg) => StorageError::Write(msg),
        other => other,
    }
}

/// Firebase-style stores read these characters as path syntax or reject
/// them outright, so ids containing them cannot round-trip.
fn check_item_ids(update: &PartialUpdate) -> Result<(), StorageError> {
    let bad = update.iter().map(|(id, _)| id.as_str()).find(|id| {
        id.chars()
            .any(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_ascii_control())
    });
    match bad {
        Some(item) => Err(StorageError::UnsupportedItemId {
            item: item.to_string(),
        }),
        None => Ok(()),
    }
}

fn document_from_value(value: Value) -> Result<ProgressDocument, StorageError> {
    match value {
        Value::Null => Ok(ProgressDocument::new()),
        other => Ok(ProgressDocument::from_value(other)?),
    }
}

#[async_trait]
impl ProgressStore for RemoteProgressStore {
    async fn initialize(&self) -> Result<(), StorageError> {
        let value = self.fetch_value().await?;
        if value.is_null() {
            debug!(key = %self.config.key, "remote progress node is empty");
            return Ok(());
        }
        match ProgressDocument::salvage_value(value) {
            Ok(salvaged) if salvaged.is_clean() => {
                debug!(key = %self.config.key, items = salvaged.document.len(), "remote progress document is valid");
                Ok(())
            }
            Ok(salvaged) => {
                warn!(
                    key = %self.config.key,
                    dropped = ?salvaged.dropped,
                    kept = salvaged.document.len(),
                    "dropping remote progress entries that are not booleans"
                );
                self.put_document(&salvaged.document).await
            }
            Err(err) => {
                warn!(key = %self.config.key, error = %err, "remote progress document is malformed, resetting");
                self.put_document(&ProgressDocument::new()).await
            }
        }
    }

    async fn load(&self) -> Result<ProgressDocument, StorageError> {
        document_from_value(self.fetch_value().await?)
    }

    async fn merge(&self, update: &PartialUpdate) -> Result<(), StorageError> {
        if update.is_empty() {
            return Ok(());
        }
        check_item_ids(update)?;
        match self.config.merge_mode {
            RemoteMergeMode::NativePatch => {
                self.send(self.request(Method::PATCH).json(update))
                    .await
                    .map_err(write_error)?;
            }
            RemoteMergeMode::ReadModifyWrite => {
                let _guard = self.rmw_lock.lock().await;
                let document = self.load().await?.merged(update);
                self.put_document(&document).await?;
            }
        }
        info!(key = %self.config.key, changed = update.len(), mode = %self.config.merge_mode, "remote progress updated");
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "remote"
    }
}
