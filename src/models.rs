use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::AccessLevel;
use crate::approval::AssignmentStatus;

/// What list and detail reads show in place of a client secret.
pub const HIDDEN_SECRET: &str = "hidden";

/// Owner id recorded on applications an admin creates for the system.
pub const ADMIN_OWNER_SENTINEL: &str = "0";

pub const NO_DESCRIPTION: &str = "No description provided";

// --- Applications ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Environment {
    #[default]
    #[serde(rename = "QA")]
    Qa,
    #[serde(rename = "UAT")]
    Uat,
    /// Production.
    #[serde(rename = "PDN")]
    Pdn,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Qa => "QA",
            Environment::Uat => "UAT",
            Environment::Pdn => "PDN",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "QA" => Some(Environment::Qa),
            "UAT" => Some(Environment::Uat),
            "PDN" | "PROD" | "PRODUCTION" => Some(Environment::Pdn),
            _ => None,
        }
    }

    pub fn status(&self) -> AppStatus {
        match self {
            Environment::Pdn => AppStatus::Live,
            _ => AppStatus::Test,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    Live,
    Test,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub client_id: String,
    /// Always [`HIDDEN_SECRET`]; real secrets only travel in a disclosure.
    pub client_secret: String,
    pub name: String,
    pub description: String,
    pub redirect_uri: String,
    pub environment: Environment,
    pub status: AppStatus,
    pub client_status: String,
    pub user_account_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Application {
    pub fn is_admin_owned(&self) -> bool {
        self.user_account_id == ADMIN_OWNER_SENTINEL
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppKeyPair {
    pub record_id: String,
    pub public_key: String,
    pub registration_date: Option<DateTime<Utc>>,
    pub last_rotation_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub name: String,
    pub description: Option<String>,
    pub redirect_uri: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplicationUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub redirect_uri: Option<String>,
    pub environment: Option<Environment>,
}

// --- User accounts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    New,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::New => "new",
            AccountStatus::Inactive => "inactive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(AccountStatus::Active),
            "new" => Some(AccountStatus::New),
            "inactive" => Some(AccountStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub name: String,
    pub email: String,
    pub access_level: AccessLevel,
    pub status: AccountStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// The only mutable fields of a user account.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserAccountUpdate {
    pub access_level: Option<AccessLevel>,
    pub status: Option<AccountStatus>,
}

// --- Catalog: countries and products ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountryStatus {
    Active,
    Inactive,
}

impl CountryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountryStatus::Active => "active",
            CountryStatus::Inactive => "inactive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(CountryStatus::Active),
            "inactive" => Some(CountryStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: String,
    pub name: String,
    pub alpha2_code: String,
    pub alpha3_code: String,
    pub calling_code: String,
    pub currency: String,
    pub flag: String,
    pub status: CountryStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCountry {
    pub name: String,
    pub alpha2_code: String,
    pub alpha3_code: String,
    pub calling_code: String,
    pub currency: String,
    pub flag: String,
    /// Case-insensitive `active` / `inactive`.
    pub status: String,
}

/// Only the flag and status of a country change after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryUpdate {
    pub flag: String,
    pub status: CountryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Pending,
    Disabled,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Pending => "pending",
            ProductStatus::Disabled => "disabled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(ProductStatus::Active),
            "pending" => Some(ProductStatus::Pending),
            "disabled" | "inactive" => Some(ProductStatus::Disabled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: ProductStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub status: ProductStatus,
}

// --- Product pairings ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPairing {
    pub record_id: String,
    pub client_id: String,
    pub product_id: String,
    pub country_id: String,
    pub call_back_url: String,
    pub pin: Option<String>,
    pub assignment_status: AssignmentStatus,
    pub product_name: String,
    pub country_name: String,
    pub country_alpha3: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPairing {
    pub client_id: String,
    pub product_id: String,
    pub country_id: String,
    pub call_back_url: String,
    pub pin: Option<String>,
}

/// Product and country of a pairing are fixed at creation; only these change.
#[derive(Debug, Clone, PartialEq)]
pub struct PairingUpdate {
    pub call_back_url: String,
    pub pin: Option<String>,
}

/// Parses the timestamp formats the backend emits.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
