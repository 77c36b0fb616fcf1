use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::{first_id, lenient_string, non_empty, FailurePolicy};
use crate::access::CatalogScope;
use crate::api::{ApiClient, Retry};
use crate::error::PortalError;
use crate::models::{Product, ProductInput, ProductStatus, NO_DESCRIPTION};

const BASE: [&str; 2] = ["appsettings", "products"];

pub const PRODUCT_KIND: &str = "product";

pub const LIST_POLICY: FailurePolicy = FailurePolicy::degrade("products.list");
pub const CREATE_POLICY: FailurePolicy = FailurePolicy::degrade("products.create");
pub const UPDATE_POLICY: FailurePolicy = FailurePolicy::degrade("products.update");
pub const DELETE_POLICY: FailurePolicy = FailurePolicy::degrade("products.delete");

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ProductWire {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(deserialize_with = "lenient_string")]
    scope_group_id: String,
    scope_group_name: Option<String>,
    name: Option<String>,
    description: Option<String>,
    scope_group_description: Option<String>,
    status: Option<String>,
}

impl From<ProductWire> for Product {
    fn from(wire: ProductWire) -> Self {
        Product {
            id: first_id(wire.id, wire.scope_group_id),
            name: wire.scope_group_name.or(wire.name).unwrap_or_default(),
            description: non_empty(wire.description)
                .or_else(|| non_empty(wire.scope_group_description))
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            kind: PRODUCT_KIND.to_string(),
            status: wire
                .status
                .as_deref()
                .and_then(ProductStatus::parse)
                .unwrap_or(ProductStatus::Pending),
        }
    }
}

#[derive(Debug, Serialize)]
struct ProductBody<'a> {
    scope_group_name: &'a str,
    description: &'a str,
    status: &'static str,
}

impl<'a> From<&'a ProductInput> for ProductBody<'a> {
    fn from(input: &'a ProductInput) -> Self {
        ProductBody {
            scope_group_name: input.name.trim(),
            description: input.description.as_deref().unwrap_or(""),
            status: input.status.as_str(),
        }
    }
}

/// Reference catalog served when the listing cannot be fetched.
pub fn fallback_products() -> Vec<Product> {
    [
        ("KYC", "Know-your-customer identity verification"),
        ("Wallets", "Mobile wallet balance and transfers"),
    ]
    .into_iter()
    .map(|(name, description)| Product {
        id: local_id(name),
        name: name.to_string(),
        description: description.to_string(),
        kind: PRODUCT_KIND.to_string(),
        status: ProductStatus::Active,
    })
    .collect()
}

/// Deterministic id for a locally synthesized product: `local-` plus the
/// first 12 hex digits of the SHA-256 of its name.
pub fn local_id(name: &str) -> String {
    let digest = Sha256::digest(name.trim().to_lowercase().as_bytes());
    format!("local-{}", &hex::encode(digest)[..12])
}

/// Local echo of the caller's input, used when a write cannot be completed.
pub fn echo(id: String, input: &ProductInput) -> Product {
    Product {
        id,
        name: input.name.trim().to_string(),
        description: non_empty(input.description.clone())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        kind: PRODUCT_KIND.to_string(),
        status: input.status,
    }
}

pub struct Products<'a> {
    api: &'a ApiClient,
}

impl<'a> Products<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Listing under [`LIST_POLICY`].
    pub async fn list(&self, scope: CatalogScope) -> Result<Vec<Product>, PortalError> {
        LIST_POLICY.apply(self.fetch(scope).await, fallback_products)
    }

    /// Listing without the fallback.
    pub async fn fetch(&self, scope: CatalogScope) -> Result<Vec<Product>, PortalError> {
        let segments: &[&str] = match scope {
            CatalogScope::All => &BASE,
            CatalogScope::ActiveOnly => &[BASE[0], BASE[1], "active"],
        };
        let records: Vec<ProductWire> = self.api.get(segments, Retry::Never).await?;
        Ok(records.into_iter().map(Product::from).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Product, PortalError> {
        let record: ProductWire = self
            .api
            .get(&[BASE[0], BASE[1], id], Retry::Configured)
            .await?;
        Ok(record.into())
    }

    pub async fn create(&self, input: &ProductInput) -> Result<Product, PortalError> {
        validate(input)?;
        let result = self
            .api
            .post::<ProductWire, _>(&BASE, &ProductBody::from(input))
            .await
            .map(Product::from);

        CREATE_POLICY.apply(result, || echo(local_id(&input.name), input))
    }

    pub async fn update(&self, id: &str, input: &ProductInput) -> Result<Product, PortalError> {
        validate(input)?;
        let result = self
            .api
            .put::<ProductWire, _>(&[BASE[0], BASE[1], id], &ProductBody::from(input))
            .await
            .map(Product::from);

        UPDATE_POLICY.apply(result, || echo(id.to_string(), input))
    }

    /// Returns the id of the removed product.
    pub async fn delete(&self, id: &str) -> Result<String, PortalError> {
        let result = self
            .api
            .delete::<Value>(&[BASE[0], BASE[1], id])
            .await
            .map(|_| id.to_string());

        DELETE_POLICY.apply(result, || id.to_string())
    }
}

fn validate(input: &ProductInput) -> Result<(), PortalError> {
    if input.name.trim().is_empty() {
        return Err(PortalError::validation("name", "Product name is required"));
    }
    Ok(())
}
