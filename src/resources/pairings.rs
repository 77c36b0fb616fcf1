use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{first_id, lenient_string, non_empty, FailurePolicy};
use crate::api::{ApiClient, Retry};
use crate::approval::{validate_pin, AssignmentStatus};
use crate::error::PortalError;
use crate::models::{NewPairing, PairingUpdate, ProductPairing};

const BASE: [&str; 2] = ["appsettings", "app"];

/// A pairing listing that cannot be fetched reads as empty.
pub const LIST_POLICY: FailurePolicy = FailurePolicy::degrade("pairings.list");

fn app_path<'s>(tail: &[&'s str]) -> Vec<&'s str> {
    BASE.iter().copied().chain(tail.iter().copied()).collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PairingWire {
    #[serde(deserialize_with = "lenient_string")]
    record_id: String,
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(deserialize_with = "lenient_string")]
    client_id: String,
    #[serde(deserialize_with = "lenient_string")]
    product_id: String,
    #[serde(deserialize_with = "lenient_string")]
    scope_group_id: String,
    #[serde(deserialize_with = "lenient_string")]
    country_id: String,
    #[serde(deserialize_with = "lenient_string")]
    opco_id: String,
    call_back_url: Option<String>,
    callback_url: Option<String>,
    pin: Option<String>,
    assignment_status: Option<String>,
    status: Option<String>,
    product_name: Option<String>,
    scope_group_name: Option<String>,
    country_name: Option<String>,
    country_alpha3: Option<String>,
}

impl From<PairingWire> for ProductPairing {
    fn from(wire: PairingWire) -> Self {
        ProductPairing {
            record_id: first_id(wire.record_id, wire.id),
            client_id: wire.client_id,
            product_id: first_id(wire.product_id, wire.scope_group_id),
            country_id: first_id(wire.country_id, wire.opco_id),
            call_back_url: wire.call_back_url.or(wire.callback_url).unwrap_or_default(),
            pin: non_empty(wire.pin),
            assignment_status: wire
                .assignment_status
                .or(wire.status)
                .as_deref()
                .map(AssignmentStatus::parse)
                .unwrap_or(AssignmentStatus::Pending),
            product_name: wire.product_name.or(wire.scope_group_name).unwrap_or_default(),
            country_name: wire.country_name.unwrap_or_default(),
            country_alpha3: wire.country_alpha3.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AddPairBody<'a> {
    client_id: &'a str,
    scope_group_id: &'a str,
    country_id: &'a str,
    call_back_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pin: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct UpdatePairBody<'a> {
    call_back_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pin: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ApprovePairBody<'a> {
    record_id: &'a str,
    assignment_status: &'static str,
    approval_pin: &'a str,
}

pub struct Pairings<'a> {
    api: &'a ApiClient,
}

impl<'a> Pairings<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Listing under [`LIST_POLICY`].
    pub async fn get_pairs(&self, client_id: &str) -> Result<Vec<ProductPairing>, PortalError> {
        LIST_POLICY.apply(self.fetch_pairs(client_id).await, Vec::new)
    }

    /// Listing without the fallback.
    pub async fn fetch_pairs(&self, client_id: &str) -> Result<Vec<ProductPairing>, PortalError> {
        let records: Vec<PairingWire> = self
            .api
            .get(&app_path(&["getpairs", client_id]), Retry::Never)
            .await?;
        Ok(records.into_iter().map(ProductPairing::from).collect())
    }

    pub async fn add_pair(&self, input: &NewPairing) -> Result<ProductPairing, PortalError> {
        if input.product_id.trim().is_empty() {
            return Err(PortalError::validation("productId", "Select a product"));
        }
        if input.country_id.trim().is_empty() {
            return Err(PortalError::validation("countryId", "Select a country"));
        }
        validate_callback(&input.call_back_url)?;

        let body = AddPairBody {
            client_id: &input.client_id,
            scope_group_id: &input.product_id,
            country_id: &input.country_id,
            call_back_url: input.call_back_url.trim(),
            pin: input.pin.as_deref(),
        };
        let record: PairingWire = self.api.post(&app_path(&["addpair"]), &body).await?;
        Ok(record.into())
    }

    pub async fn update_pair(
        &self,
        record_id: &str,
        changes: &PairingUpdate,
    ) -> Result<ProductPairing, PortalError> {
        validate_callback(&changes.call_back_url)?;
        let body = UpdatePairBody {
            call_back_url: changes.call_back_url.trim(),
            pin: changes.pin.as_deref(),
        };
        let record: PairingWire = self
            .api
            .patch(&app_path(&["updatepair", record_id]), Some(&body))
            .await?;
        Ok(record.into())
    }

    /// Owner removal; the pairing is gone afterwards.
    pub async fn remove_pair(&self, record_id: &str) -> Result<(), PortalError> {
        self.status_action("removepair", record_id).await
    }

    /// Owner deactivation; no admin PIN involved.
    pub async fn deactivate_pair(&self, record_id: &str) -> Result<(), PortalError> {
        self.status_action("deactivatepair", record_id).await
    }

    pub async fn reject_product(&self, record_id: &str) -> Result<(), PortalError> {
        self.status_action("rejectproduct", record_id).await
    }

    pub async fn activate_product(&self, record_id: &str) -> Result<(), PortalError> {
        self.status_action("activateproduct", record_id).await
    }

    pub async fn deactivate_product(&self, record_id: &str) -> Result<(), PortalError> {
        self.status_action("deactivateproduct", record_id).await
    }

    /// Approves a pending pairing in one request carrying the record id, the
    /// target status and the operator PIN. The PIN is validated first and is
    /// never kept.
    pub async fn approve_pair(&self, record_id: &str, approval_pin: &str) -> Result<(), PortalError> {
        validate_pin(approval_pin)?;
        let body = ApprovePairBody {
            record_id,
            assignment_status: AssignmentStatus::Active.as_str(),
            approval_pin,
        };
        let _: Value = self.api.post(&app_path(&["approvepair"]), &body).await?;
        Ok(())
    }

    async fn status_action(&self, action: &str, record_id: &str) -> Result<(), PortalError> {
        let _: Value = self
            .api
            .patch(&app_path(&[action, record_id]), None::<&Value>)
            .await?;
        Ok(())
    }
}

fn validate_callback(url: &str) -> Result<(), PortalError> {
    match reqwest::Url::parse(url.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(PortalError::validation(
            "callBackUrl",
            "Callback URL must be an absolute http(s) URL",
        )),
    }
}
