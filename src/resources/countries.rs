use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient_string, FailurePolicy};
use crate::access::CatalogScope;
use crate::api::{ApiClient, Retry};
use crate::error::PortalError;
use crate::models::{Country, CountryStatus, CountryUpdate, NewCountry};

const BASE: &str = "opcos";

/// The listing never blocks the UI: any failure serves [`fallback_countries`].
pub const LIST_POLICY: FailurePolicy = FailurePolicy::degrade("countries.list");

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CountryWire {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    name: Option<String>,
    country_name: Option<String>,
    alpha2_code: Option<String>,
    alpha_2_code: Option<String>,
    alpha3_code: Option<String>,
    alpha_3_code: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    calling_code: String,
    currency: String,
    flag: String,
    status: String,
}

impl From<CountryWire> for Country {
    fn from(wire: CountryWire) -> Self {
        Country {
            id: wire.id,
            name: wire.name.or(wire.country_name).unwrap_or_default(),
            alpha2_code: wire
                .alpha2_code
                .or(wire.alpha_2_code)
                .unwrap_or_default()
                .to_ascii_uppercase(),
            alpha3_code: wire
                .alpha3_code
                .or(wire.alpha_3_code)
                .unwrap_or_default()
                .to_ascii_uppercase(),
            calling_code: wire.calling_code,
            currency: wire.currency,
            flag: wire.flag,
            status: CountryStatus::parse(&wire.status).unwrap_or(CountryStatus::Inactive),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateCountryBody<'a> {
    name: &'a str,
    alpha2_code: String,
    alpha3_code: String,
    calling_code: &'a str,
    currency: &'a str,
    flag: &'a str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct UpdateCountryBody<'a> {
    flag: &'a str,
    status: &'static str,
}

/// Built-in reference list served when the listing cannot be fetched.
pub fn fallback_countries() -> Vec<Country> {
    vec![
        Country {
            id: "1".to_string(),
            name: "Rwanda".to_string(),
            alpha2_code: "RW".to_string(),
            alpha3_code: "RWA".to_string(),
            calling_code: "250".to_string(),
            currency: "RWF".to_string(),
            flag: "rwanda".to_string(),
            status: CountryStatus::Active,
        },
        Country {
            id: "2".to_string(),
            name: "Kenya".to_string(),
            alpha2_code: "KE".to_string(),
            alpha3_code: "KEN".to_string(),
            calling_code: "254".to_string(),
            currency: "KES".to_string(),
            flag: "kenya".to_string(),
            status: CountryStatus::Inactive,
        },
    ]
}

pub struct Countries<'a> {
    api: &'a ApiClient,
}

impl<'a> Countries<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Listing under [`LIST_POLICY`].
    pub async fn list(&self, scope: CatalogScope) -> Result<Vec<Country>, PortalError> {
        LIST_POLICY.apply(self.fetch(scope).await, fallback_countries)
    }

    /// Listing without the fallback.
    pub async fn fetch(&self, scope: CatalogScope) -> Result<Vec<Country>, PortalError> {
        let segments: &[&str] = match scope {
            CatalogScope::All => &[BASE],
            CatalogScope::ActiveOnly => &[BASE, "active"],
        };
        let records: Vec<CountryWire> = self.api.get(segments, Retry::Never).await?;
        Ok(records.into_iter().map(Country::from).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Country, PortalError> {
        let record: CountryWire = self.api.get(&[BASE, id], Retry::Configured).await?;
        Ok(record.into())
    }

    pub async fn create(&self, input: &NewCountry) -> Result<Country, PortalError> {
        let status = validate_new(input)?;
        let body = CreateCountryBody {
            name: input.name.trim(),
            alpha2_code: input.alpha2_code.trim().to_ascii_uppercase(),
            alpha3_code: input.alpha3_code.trim().to_ascii_uppercase(),
            calling_code: input.calling_code.trim(),
            currency: input.currency.trim(),
            flag: input.flag.trim(),
            status: status.as_str(),
        };
        let record: CountryWire = self.api.post(&[BASE], &body).await?;
        Ok(record.into())
    }

    /// Only the flag and the status are sent; the other attributes are fixed.
    pub async fn update(&self, id: &str, changes: &CountryUpdate) -> Result<Country, PortalError> {
        let body = UpdateCountryBody {
            flag: changes.flag.trim(),
            status: changes.status.as_str(),
        };
        let record: CountryWire = self.api.put(&[BASE, id], &body).await?;
        Ok(record.into())
    }

    pub async fn delete(&self, id: &str) -> Result<(), PortalError> {
        let _: Value = self.api.delete(&[BASE, id]).await?;
        Ok(())
    }
}

fn validate_new(input: &NewCountry) -> Result<CountryStatus, PortalError> {
    if input.name.trim().is_empty() {
        return Err(PortalError::validation("name", "Country name is required"));
    }
    if !is_code(&input.alpha2_code, 2) {
        return Err(PortalError::validation(
            "alpha2Code",
            "Alpha-2 code must be exactly 2 letters",
        ));
    }
    if !is_code(&input.alpha3_code, 3) {
        return Err(PortalError::validation(
            "alpha3Code",
            "Alpha-3 code must be exactly 3 letters",
        ));
    }
    CountryStatus::parse(&input.status)
        .ok_or_else(|| PortalError::validation("status", "Status must be active or inactive"))
}

fn is_code(raw: &str, len: usize) -> bool {
    let raw = raw.trim();
    raw.len() == len && raw.chars().all(|c| c.is_ascii_alphabetic())
}
