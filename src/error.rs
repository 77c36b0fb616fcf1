use reqwest::StatusCode;

use crate::access::Operation;
use crate::approval::AssignmentStatus;
use crate::mutation::ActionKey;

pub type Result<T> = std::result::Result<T, PortalError>;

/// Coarse classification of a [`PortalError`], used by callers to decide
/// whether to show a retry affordance, a field message or an explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Non-2xx response or transport failure.
    Network,
    /// 2xx response without the `{success, data}` envelope.
    Shape,
    /// Client-side field validation; nothing was sent.
    Validation,
    /// Operation deliberately not offered by the backend.
    Unsupported,
    /// Refused locally by role gating, a state machine or an in-flight guard.
    Local,
}

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("Request failed ({status}): {message}")]
    RequestFailed { status: StatusCode, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response shape: {0}")]
    InvalidResponseShape(String),

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Operation not permitted for this access level: {0:?}")]
    Forbidden(Operation),

    #[error("Cannot {action} a pairing that is {from}")]
    InvalidTransition {
        action: &'static str,
        from: AssignmentStatus,
    },

    #[error("Action already in progress: {0}")]
    MutationPending(ActionKey),

    #[error("A disclosure is already open")]
    DisclosureBusy,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PortalError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        PortalError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PortalError::RequestFailed { .. } | PortalError::Transport(_) => ErrorKind::Network,
            PortalError::InvalidResponseShape(_) | PortalError::Json(_) => ErrorKind::Shape,
            PortalError::Validation { .. } => ErrorKind::Validation,
            PortalError::UnsupportedOperation(_) => ErrorKind::Unsupported,
            PortalError::Forbidden(_)
            | PortalError::InvalidTransition { .. }
            | PortalError::MutationPending(_)
            | PortalError::DisclosureBusy
            | PortalError::NotSignedIn
            | PortalError::Storage(_)
            | PortalError::Config(_) => ErrorKind::Local,
        }
    }

    /// True when the error was produced without any network round trip.
    pub fn is_local(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Network | ErrorKind::Shape)
    }

    /// HTTP status carried by a failed request, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PortalError::RequestFailed { status, .. } => Some(*status),
            PortalError::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
