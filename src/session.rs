use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::access::AccessLevel;
use crate::error::PortalError;

/// Profile of the signed-in user, persisted next to the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub access_level: AccessLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

/// Persisted client storage holding the raw session document.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>, PortalError>;
    async fn save(&self, raw: &str) -> Result<(), PortalError>;
    async fn clear(&self) -> Result<(), PortalError>;
}

/// JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<String>, PortalError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortalError::Storage(format!(
                "Failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn save(&self, raw: &str) -> Result<(), PortalError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortalError::Storage(format!("Failed to create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| PortalError::Storage(format!("Failed to write {}: {e}", self.path.display())))
    }

    async fn clear(&self) -> Result<(), PortalError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortalError::Storage(format!(
                "Failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    raw: RwLock<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: RwLock::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.read().ok().and_then(|r| r.clone())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<String>, PortalError> {
        Ok(self.raw())
    }

    async fn save(&self, raw: &str) -> Result<(), PortalError> {
        let mut slot = self
            .raw
            .write()
            .map_err(|_| PortalError::Storage("session lock poisoned".to_string()))?;
        *slot = Some(raw.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), PortalError> {
        let mut slot = self
            .raw
            .write()
            .map_err(|_| PortalError::Storage("session lock poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}

/// Session context injected into the API client.
///
/// The token is read from the store once on [`Session::load`] and cached;
/// it is replaced on login and dropped on logout or on a 401 from the backend.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
    current: Arc<RwLock<Option<StoredSession>>>,
}

impl Session {
    pub async fn load(store: Arc<dyn SessionStore>) -> Self {
        let current = match store.load().await {
            Ok(Some(raw)) => parse_stored(&raw),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Session store unreadable, continuing anonymously: {e}");
                None
            }
        };

        Self {
            store,
            current: Arc::new(RwLock::new(current)),
        }
    }

    /// Request headers for the backend. Never fails: without a usable token
    /// only the content type is set.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.token() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    pub fn token(&self) -> Option<String> {
        self.current
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|s| s.token.clone()))
            .filter(|t| !t.is_empty())
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.current
            .read()
            .ok()
            .and_then(|s| s.as_ref().and_then(|s| s.user.clone()))
    }

    pub fn access_level(&self) -> Option<AccessLevel> {
        self.user().map(|u| u.access_level)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub async fn set(&self, session: StoredSession) -> Result<(), PortalError> {
        let raw = serde_json::to_string(&session)?;
        self.store.save(&raw).await?;
        if let Ok(mut current) = self.current.write() {
            *current = Some(session);
        }
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), PortalError> {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
        self.store.clear().await
    }
}

/// Accepts either the full session document or a bare JSON string token.
fn parse_stored(raw: &str) -> Option<StoredSession> {
    match serde_json::from_str::<serde_json::Value>(raw).ok()? {
        serde_json::Value::String(token) if !token.is_empty() => {
            Some(StoredSession { token, user: None })
        }
        value @ serde_json::Value::Object(_) => {
            let stored: StoredSession = serde_json::from_value(value).ok()?;
            (!stored.token.is_empty()).then_some(stored)
        }
        _ => None,
    }
}
