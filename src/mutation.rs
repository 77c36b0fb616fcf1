use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::cache::{QueryCache, QueryScope};
use crate::error::PortalError;

/// Identity of a triggering control: the kind of action plus its target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub action: &'static str,
    pub target: Option<String>,
}

impl ActionKey {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            target: None,
        }
    }

    pub fn on(action: &'static str, target: impl Into<String>) -> Self {
        Self {
            action,
            target: Some(target.into()),
        }
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{}({target})", self.action),
            None => f.write_str(self.action),
        }
    }
}

/// Runs state-changing calls: one in flight per action key, cache
/// invalidation on success, prior cache left intact on failure.
#[derive(Clone)]
pub struct MutationOrchestrator {
    cache: QueryCache,
    in_flight: Arc<Mutex<HashSet<ActionKey>>>,
}

impl MutationOrchestrator {
    pub fn new(cache: QueryCache) -> Self {
        Self {
            cache,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Whether the control for `key` should currently be disabled.
    pub fn is_pending(&self, key: &ActionKey) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(key))
            .unwrap_or(false)
    }

    pub async fn run<T, Fut>(
        &self,
        key: ActionKey,
        invalidates: &[QueryScope],
        call: Fut,
    ) -> Result<T, PortalError>
    where
        Fut: Future<Output = Result<T, PortalError>>,
    {
        let _guard = self.claim(key.clone())?;

        let value = match call.await {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(action = %key, "mutation failed: {e}");
                return Err(e);
            }
        };

        let mut dropped = 0;
        for scope in invalidates {
            dropped += self.cache.invalidate(scope).await;
        }
        tracing::info!(action = %key, ?invalidates, dropped, "mutation applied");

        Ok(value)
    }

    fn claim(&self, key: ActionKey) -> Result<InFlight, PortalError> {
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| PortalError::Storage("in-flight lock poisoned".to_string()))?;
        if !set.insert(key.clone()) {
            return Err(PortalError::MutationPending(key));
        }
        Ok(InFlight {
            key,
            set: Arc::clone(&self.in_flight),
        })
    }
}

struct InFlight {
    key: ActionKey,
    set: Arc<Mutex<HashSet<ActionKey>>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.key);
        }
    }
}
