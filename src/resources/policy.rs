use crate::error::PortalError;

/// What a resource operation does when its request fails.
///
/// `Propagate` hands the error to the caller. `Degrade` substitutes a locally
/// built value so the view keeps rendering; it is reserved for reference
/// data where an empty or stale screen is worse than a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    pub operation: &'static str,
    pub fallback_on_error: bool,
}

impl FailurePolicy {
    pub const fn propagate(operation: &'static str) -> Self {
        Self {
            operation,
            fallback_on_error: false,
        }
    }

    pub const fn degrade(operation: &'static str) -> Self {
        Self {
            operation,
            fallback_on_error: true,
        }
    }

    /// Local errors (validation, gating, state machines) always propagate.
    pub fn apply<T>(
        &self,
        result: Result<T, PortalError>,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, PortalError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if self.fallback_on_error && !e.is_local() => {
                tracing::warn!(
                    operation = self.operation,
                    "request failed, serving local fallback: {e}"
                );
                Ok(fallback())
            }
            Err(e) => Err(e),
        }
    }
}
