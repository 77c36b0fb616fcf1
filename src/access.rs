//! Role gating.
//!
//! A single place that decides, from the caller's access level and whether an
//! application is currently selected, which operations may be offered. The
//! resource clients use the same access level to pick the endpoint variant, so
//! a standard user never issues an admin listing call.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PortalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AccessLevel {
    Standard,
    Admin,
}

impl AccessLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            AccessLevel::Standard => 1,
            AccessLevel::Admin => 2,
        }
    }

    pub fn is_admin(self) -> bool {
        self == AccessLevel::Admin
    }
}

impl TryFrom<u8> for AccessLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AccessLevel::Standard),
            2 => Ok(AccessLevel::Admin),
            other => Err(format!("unknown access level {other}")),
        }
    }
}

impl From<AccessLevel> for u8 {
    fn from(level: AccessLevel) -> Self {
        level.as_u8()
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Which listing endpoint a catalog read should hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogScope {
    /// Every record, regardless of status (admin).
    All,
    /// Active records only (standard users).
    ActiveOnly,
}

impl From<AccessLevel> for CatalogScope {
    fn from(level: AccessLevel) -> Self {
        match level {
            AccessLevel::Admin => CatalogScope::All,
            AccessLevel::Standard => CatalogScope::ActiveOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    ListOwnApplications,
    ListAllApplications,
    CreateApplication,
    UpdateApplication,
    DeleteApplication,
    RotateApplicationCredentials,

    ListCatalog,
    ListInactiveCatalog,
    CreateCatalogEntry,
    UpdateCatalogEntry,
    DeleteCatalogEntry,
    ToggleCatalogEntry,

    ListUserAccounts,
    UpdateUserAccount,

    ListPairings,
    CreatePairing,
    EditPairing,
    DeactivateOwnPairing,
    RemovePairing,
    ApprovePairing,
    RejectPairing,
    ActivatePairing,
    DeactivatePairing,
}

/// The operations a view may present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub access_level: AccessLevel,
    pub application_selected: bool,
    allowed: BTreeSet<Operation>,
}

impl Capabilities {
    pub fn allows(&self, op: Operation) -> bool {
        self.allowed.contains(&op)
    }

    pub fn require(&self, op: Operation) -> Result<(), PortalError> {
        if self.allows(op) {
            Ok(())
        } else {
            Err(PortalError::Forbidden(op))
        }
    }

    pub fn operations(&self) -> impl Iterator<Item = Operation> + '_ {
        self.allowed.iter().copied()
    }

    pub fn catalog_scope(&self) -> CatalogScope {
        self.access_level.into()
    }
}

pub fn resolve(access_level: AccessLevel, application_selected: bool) -> Capabilities {
    use Operation::*;

    let ops: &[Operation] = match (access_level, application_selected) {
        (AccessLevel::Admin, false) => &[
            ListAllApplications,
            CreateApplication,
            UpdateApplication,
            DeleteApplication,
            RotateApplicationCredentials,
            ListCatalog,
            ListInactiveCatalog,
            CreateCatalogEntry,
            UpdateCatalogEntry,
            DeleteCatalogEntry,
            ToggleCatalogEntry,
            ListUserAccounts,
            UpdateUserAccount,
        ],
        (AccessLevel::Admin, true) => &[
            UpdateApplication,
            RotateApplicationCredentials,
            ListCatalog,
            ListInactiveCatalog,
            ListPairings,
            ApprovePairing,
            RejectPairing,
            ActivatePairing,
            DeactivatePairing,
        ],
        (AccessLevel::Standard, false) => &[
            ListOwnApplications,
            CreateApplication,
            UpdateApplication,
            DeleteApplication,
            RotateApplicationCredentials,
            ListCatalog,
        ],
        (AccessLevel::Standard, true) => &[
            UpdateApplication,
            RotateApplicationCredentials,
            ListCatalog,
            ListPairings,
            CreatePairing,
            EditPairing,
            DeactivateOwnPairing,
            RemovePairing,
        ],
    };

    Capabilities {
        access_level,
        application_selected,
        allowed: ops.iter().copied().collect(),
    }
}
