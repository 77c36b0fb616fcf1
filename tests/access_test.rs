use dev_portal::access::{resolve, AccessLevel, CatalogScope, Operation};
use dev_portal::approval::{next_status, validate_pin, AssignmentStatus, Transition};
use dev_portal::PortalError;

use AccessLevel::{Admin, Standard};
use AssignmentStatus::*;

// ─── Capability resolution ───────────────────────────────────────────────────

#[test]
fn standard_without_selection() {
    let caps = resolve(Standard, false);

    assert!(caps.allows(Operation::ListOwnApplications));
    assert!(caps.allows(Operation::CreateApplication));
    assert!(!caps.allows(Operation::ListAllApplications));
    assert!(!caps.allows(Operation::ListUserAccounts));
    assert!(!caps.allows(Operation::CreateCatalogEntry));
    assert_eq!(caps.catalog_scope(), CatalogScope::ActiveOnly);
}

#[test]
fn standard_with_selection_manages_pairings() {
    let caps = resolve(Standard, true);

    for op in [
        Operation::ListPairings,
        Operation::CreatePairing,
        Operation::EditPairing,
        Operation::DeactivateOwnPairing,
        Operation::RemovePairing,
    ] {
        assert!(caps.allows(op), "{op:?}");
    }
    assert!(!caps.allows(Operation::ApprovePairing));
    assert!(!caps.allows(Operation::ListInactiveCatalog));
}

#[test]
fn admin_without_selection() {
    let caps = resolve(Admin, false);

    assert!(caps.allows(Operation::ListAllApplications));
    assert!(caps.allows(Operation::ToggleCatalogEntry));
    assert!(caps.allows(Operation::UpdateUserAccount));
    assert!(!caps.allows(Operation::ListOwnApplications));
    assert!(!caps.allows(Operation::ApprovePairing));
    assert_eq!(caps.catalog_scope(), CatalogScope::All);
}

#[test]
fn admin_with_selection_moderates_pairings() {
    let caps = resolve(Admin, true);

    for op in [
        Operation::ApprovePairing,
        Operation::RejectPairing,
        Operation::ActivatePairing,
        Operation::DeactivatePairing,
    ] {
        assert!(caps.allows(op), "{op:?}");
    }
    assert!(!caps.allows(Operation::CreatePairing));
    assert!(!caps.allows(Operation::RemovePairing));
}

#[test]
fn operations_lists_the_allowed_set() {
    let caps = resolve(Admin, true);
    let ops: Vec<_> = caps.operations().collect();

    assert_eq!(ops.len(), 9);
    assert!(ops.iter().all(|op| caps.allows(*op)));
}

#[test]
fn require_reports_the_refused_operation() {
    let err = resolve(Standard, false)
        .require(Operation::ListUserAccounts)
        .unwrap_err();
    assert!(matches!(err, PortalError::Forbidden(Operation::ListUserAccounts)));
    assert!(err.is_local());
}

#[test]
fn access_level_wire_values() {
    assert_eq!(serde_json::to_string(&Admin).unwrap(), "2");
    assert_eq!(serde_json::from_str::<AccessLevel>("1").unwrap(), Standard);
    assert!(serde_json::from_str::<AccessLevel>("3").is_err());
}

// ─── Pairing transitions ─────────────────────────────────────────────────────

#[test]
fn admin_transitions() {
    assert_eq!(next_status(Pending, Transition::Approve, Admin).unwrap(), Active);
    assert_eq!(next_status(Pending, Transition::Reject, Admin).unwrap(), Rejected);
    assert_eq!(next_status(Inactive, Transition::Activate, Admin).unwrap(), Active);
    assert_eq!(next_status(Active, Transition::Deactivate, Admin).unwrap(), Inactive);
    assert_eq!(next_status(Pending, Transition::Deactivate, Admin).unwrap(), Inactive);
}

#[test]
fn owner_transitions() {
    assert_eq!(
        next_status(Active, Transition::DeactivateOwn, Standard).unwrap(),
        Inactive
    );
    for from in [Pending, Active, Inactive, Rejected] {
        assert_eq!(next_status(from, Transition::Remove, Standard).unwrap(), Deleted);
    }
}

#[test]
fn invalid_transitions_are_refused() {
    for (from, transition) in [
        (Active, Transition::Approve),
        (Rejected, Transition::Approve),
        (Active, Transition::Reject),
        (Active, Transition::Activate),
        (Rejected, Transition::Activate),
        (Inactive, Transition::Deactivate),
    ] {
        let err = next_status(from, transition, Admin).unwrap_err();
        assert!(
            matches!(err, PortalError::InvalidTransition { .. }),
            "{transition:?} from {from}"
        );
    }
    assert!(next_status(Deleted, Transition::Remove, Standard).is_err());
}

#[test]
fn transitions_are_role_bound() {
    assert!(matches!(
        next_status(Pending, Transition::Approve, Standard).unwrap_err(),
        PortalError::Forbidden(Operation::ApprovePairing)
    ));
    assert!(matches!(
        next_status(Active, Transition::DeactivateOwn, Admin).unwrap_err(),
        PortalError::Forbidden(Operation::DeactivateOwnPairing)
    ));
}

#[test]
fn unknown_wire_status_reads_as_pending() {
    assert_eq!(AssignmentStatus::parse("ACTIVE"), Active);
    assert_eq!(AssignmentStatus::parse("awaiting review"), Pending);
    assert_eq!(AssignmentStatus::parse(""), Pending);
}

#[test]
fn pin_length() {
    assert!(validate_pin("1234").is_ok());
    assert!(validate_pin("abcdef").is_ok());
    assert!(validate_pin("abc ").is_ok());
    assert!(validate_pin(" 12 ").is_ok());
    for short in ["", "1", "123", "   "] {
        let err = validate_pin(short).unwrap_err();
        assert!(matches!(err, PortalError::Validation { field: "approval_pin", .. }));
    }
}
