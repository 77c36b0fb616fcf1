use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{first_id, lenient_string, non_empty};
use crate::access::AccessLevel;
use crate::api::{ApiClient, Retry};
use crate::error::PortalError;
use crate::models::{parse_timestamp, AccountStatus, UserAccount, UserAccountUpdate};
use crate::session::SessionUser;

const BASE: &str = "useraccounts";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct UserAccountWire {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(deserialize_with = "lenient_string")]
    user_account_id: String,
    full_name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: String,
    #[serde(deserialize_with = "access_level")]
    access_level: Option<AccessLevel>,
    status: Option<String>,
    created_at: Option<String>,
    last_login_at: Option<String>,
    last_login: Option<String>,
}

impl UserAccountWire {
    /// Full name when present, otherwise first and last name, otherwise email.
    fn display_name(&self) -> String {
        if let Some(full) = non_empty(self.full_name.clone()) {
            return full;
        }
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            self.email.clone()
        } else {
            joined
        }
    }
}

impl From<UserAccountWire> for UserAccount {
    fn from(wire: UserAccountWire) -> Self {
        UserAccount {
            name: wire.display_name(),
            access_level: wire.access_level.unwrap_or(AccessLevel::Standard),
            status: wire
                .status
                .as_deref()
                .and_then(AccountStatus::parse)
                .unwrap_or(AccountStatus::New),
            created_at: wire.created_at.as_deref().and_then(parse_timestamp),
            last_login_at: wire
                .last_login_at
                .as_deref()
                .or(wire.last_login.as_deref())
                .and_then(parse_timestamp),
            id: first_id(wire.id, wire.user_account_id),
            email: wire.email,
        }
    }
}

impl From<UserAccountWire> for SessionUser {
    fn from(wire: UserAccountWire) -> Self {
        SessionUser {
            name: wire.display_name(),
            access_level: wire.access_level.unwrap_or(AccessLevel::Standard),
            id: first_id(wire.id, wire.user_account_id),
            email: wire.email,
        }
    }
}

/// Accepts `2`, `"2"` or null.
fn access_level<'de, D>(deserializer: D) -> Result<Option<AccessLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(raw
        .and_then(|n| u8::try_from(n).ok())
        .and_then(|n| AccessLevel::try_from(n).ok()))
}

#[derive(Debug, Serialize)]
struct UpdateUserAccountBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    access_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
}

pub struct UserAccounts<'a> {
    api: &'a ApiClient,
}

impl<'a> UserAccounts<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<UserAccount>, PortalError> {
        let records: Vec<UserAccountWire> = self.api.get(&[BASE], Retry::Configured).await?;
        Ok(records.into_iter().map(UserAccount::from).collect())
    }

    pub async fn get(&self, id: &str) -> Result<UserAccount, PortalError> {
        let record: UserAccountWire = self.api.get(&[BASE, id], Retry::Configured).await?;
        Ok(record.into())
    }

    pub async fn by_status(&self, status: AccountStatus) -> Result<Vec<UserAccount>, PortalError> {
        let records: Vec<UserAccountWire> = self
            .api
            .get(&[BASE, "bystatus", status.as_str()], Retry::Configured)
            .await?;
        Ok(records.into_iter().map(UserAccount::from).collect())
    }

    pub async fn by_email(&self, email: &str) -> Result<UserAccount, PortalError> {
        let record: UserAccountWire = self
            .api
            .get(&[BASE, "byemail", email.trim()], Retry::Configured)
            .await?;
        Ok(record.into())
    }

    /// Only the access level and the status of an account can change.
    pub async fn update(
        &self,
        id: &str,
        changes: &UserAccountUpdate,
    ) -> Result<UserAccount, PortalError> {
        if changes.access_level.is_none() && changes.status.is_none() {
            return Err(PortalError::validation(
                "accessLevel",
                "Nothing to update: set an access level or a status",
            ));
        }
        let body = UpdateUserAccountBody {
            access_level: changes.access_level.map(AccessLevel::as_u8),
            status: changes.status.map(|s| s.as_str()),
        };
        let record: UserAccountWire = self.api.put(&[BASE, id], &body).await?;
        Ok(record.into())
    }

    /// Accounts are created through sign-up, never from the portal.
    pub fn create(&self) -> Result<UserAccount, PortalError> {
        Err(PortalError::UnsupportedOperation(
            "User accounts are created by signing up; they cannot be created here".to_string(),
        ))
    }

    /// Accounts can be deactivated but never deleted.
    pub fn delete(&self, _id: &str) -> Result<(), PortalError> {
        Err(PortalError::UnsupportedOperation(
            "User accounts cannot be deleted; set their status to inactive instead".to_string(),
        ))
    }
}
