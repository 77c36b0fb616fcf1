use std::fmt;

use serde::{Deserialize, Serialize};

use crate::access::{AccessLevel, Operation};
use crate::error::PortalError;

pub const MIN_PIN_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Active,
    Inactive,
    Rejected,
    Deleted,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Active => "active",
            AssignmentStatus::Inactive => "inactive",
            AssignmentStatus::Rejected => "rejected",
            AssignmentStatus::Deleted => "deleted",
        }
    }

    /// Lenient parse of the wire value; unknown values read as pending.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" | "approved" => AssignmentStatus::Active,
            "inactive" | "deactivated" => AssignmentStatus::Inactive,
            "rejected" => AssignmentStatus::Rejected,
            "deleted" | "removed" => AssignmentStatus::Deleted,
            _ => AssignmentStatus::Pending,
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject,
    Activate,
    Deactivate,
    DeactivateOwn,
    Remove,
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::Reject => "reject",
            Transition::Activate => "activate",
            Transition::Deactivate => "deactivate",
            Transition::DeactivateOwn => "deactivate",
            Transition::Remove => "remove",
        }
    }

    fn admin_only(&self) -> bool {
        matches!(
            self,
            Transition::Approve | Transition::Reject | Transition::Activate | Transition::Deactivate
        )
    }
}

/// Target status of `transition` applied by `actor` to a pairing in `from`.
pub fn next_status(
    from: AssignmentStatus,
    transition: Transition,
    actor: AccessLevel,
) -> Result<AssignmentStatus, PortalError> {
    use AssignmentStatus::*;

    let permitted = if transition.admin_only() {
        actor.is_admin()
    } else {
        !actor.is_admin()
    };
    if !permitted {
        return Err(PortalError::Forbidden(match transition {
            Transition::Approve => Operation::ApprovePairing,
            Transition::Reject => Operation::RejectPairing,
            Transition::Activate => Operation::ActivatePairing,
            Transition::Deactivate => Operation::DeactivatePairing,
            Transition::DeactivateOwn => Operation::DeactivateOwnPairing,
            Transition::Remove => Operation::RemovePairing,
        }));
    }

    let to = match (transition, from) {
        (Transition::Approve, Pending) => Active,
        (Transition::Reject, Pending) => Rejected,
        (Transition::Activate, Inactive) => Active,
        (Transition::Deactivate, Active | Pending) => Inactive,
        (Transition::DeactivateOwn, Active | Pending) => Inactive,
        (Transition::Remove, s) if s != Deleted => Deleted,
        _ => {
            return Err(PortalError::InvalidTransition {
                action: transition.name(),
                from,
            })
        }
    };
    Ok(to)
}

/// Rejects approval PINs shorter than [`MIN_PIN_LEN`] before any request.
/// The PIN is measured and sent exactly as typed.
pub fn validate_pin(pin: &str) -> Result<(), PortalError> {
    if pin.chars().count() < MIN_PIN_LEN {
        return Err(PortalError::validation(
            "approval_pin",
            format!("Approval PIN must be at least {MIN_PIN_LEN} characters"),
        ));
    }
    Ok(())
}
