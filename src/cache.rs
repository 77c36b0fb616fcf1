use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::access::CatalogScope;
use crate::error::PortalError;

/// Identity of a cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// `None` is the global admin listing.
    Applications { user_id: Option<String> },
    Application { client_id: String },
    AppKeys { client_id: String },
    Countries { scope: Scope },
    Country { id: String },
    Products { scope: Scope },
    Product { id: String },
    Pairings { client_id: String },
    UserAccounts,
    UserAccount { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    All,
    Active,
}

impl From<CatalogScope> for Scope {
    fn from(scope: CatalogScope) -> Self {
        match scope {
            CatalogScope::All => Scope::All,
            CatalogScope::ActiveOnly => Scope::Active,
        }
    }
}

/// A set of keys dropped together after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryScope {
    Applications,
    Application(String),
    Countries,
    Products,
    Pairings(String),
    UserAccounts,
    Everything,
}

impl QueryScope {
    pub fn covers(&self, key: &QueryKey) -> bool {
        match (self, key) {
            (QueryScope::Everything, _) => true,
            (QueryScope::Applications, QueryKey::Applications { .. })
            | (QueryScope::Applications, QueryKey::Application { .. })
            | (QueryScope::Applications, QueryKey::AppKeys { .. }) => true,
            (QueryScope::Application(id), QueryKey::Application { client_id })
            | (QueryScope::Application(id), QueryKey::AppKeys { client_id }) => id == client_id,
            (QueryScope::Application(_), QueryKey::Applications { .. }) => true,
            (QueryScope::Countries, QueryKey::Countries { .. })
            | (QueryScope::Countries, QueryKey::Country { .. }) => true,
            (QueryScope::Products, QueryKey::Products { .. })
            | (QueryScope::Products, QueryKey::Product { .. }) => true,
            (QueryScope::Pairings(id), QueryKey::Pairings { client_id }) => id == client_id,
            (QueryScope::UserAccounts, QueryKey::UserAccounts)
            | (QueryScope::UserAccounts, QueryKey::UserAccount { .. }) => true,
            _ => false,
        }
    }
}

struct Entry {
    value: Value,
    fetched_at: Instant,
}

/// Read-through cache of decoded view models.
///
/// Writes never touch entries directly; they invalidate and the next read
/// refetches. A failed fetch leaves the previous entry untouched.
#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, Entry>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, PortalError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, PortalError>>,
    {
        if let Some(value) = self.get::<T>(&key).await {
            return Ok(value);
        }

        // The lock is not held across the fetch; concurrent misses both fetch
        // and the last one to finish wins.
        let fresh = fetch().await?;
        let value = serde_json::to_value(&fresh)?;
        self.entries.lock().await.insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
        Ok(fresh)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries.lock().await;
        let entry = entries.get(key)?;
        serde_json::from_value(entry.value.clone()).ok()
    }

    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    pub async fn fetched_at(&self, key: &QueryKey) -> Option<Instant> {
        self.entries.lock().await.get(key).map(|e| e.fetched_at)
    }

    /// Drops every key covered by `scope`, returning how many were removed.
    pub async fn invalidate(&self, scope: &QueryScope) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, _| !scope.covers(key));
        before - entries.len()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
