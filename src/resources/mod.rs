//! One client per backend resource.
//!
//! Each client translates between the snake_case wire records and the
//! camelCase view models in [`crate::models`], and owns the failure policy of
//! its operations.

pub mod applications;
pub mod auth;
pub mod countries;
pub mod pairings;
pub mod policy;
pub mod products;
pub mod user_accounts;

pub use applications::Applications;
pub use auth::Auth;
pub use countries::Countries;
pub use pairings::Pairings;
pub use policy::FailurePolicy;
pub use products::Products;
pub use user_accounts::UserAccounts;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Ids and codes arrive as strings or numbers; missing and null read as "".
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Backends spell some ids two ways; the first non-empty spelling wins.
pub(crate) fn first_id(primary: String, alternate: String) -> String {
    if primary.is_empty() {
        alternate
    } else {
        primary
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
