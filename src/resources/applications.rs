use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{first_id, lenient_string, non_empty};
use crate::access::AccessLevel;
use crate::api::{ApiClient, Retry};
use crate::disclosure::Secret;
use crate::error::PortalError;
use crate::models::{
    parse_timestamp, AppKeyPair, Application, ApplicationUpdate, Environment, NewApplication,
    HIDDEN_SECRET, NO_DESCRIPTION,
};

const BASE: [&str; 3] = ["auth", "oauth2", "client"];

fn client_path<'s>(tail: &[&'s str]) -> Vec<&'s str> {
    BASE.iter().copied().chain(tail.iter().copied()).collect()
}

// --- Wire records ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ApplicationWire {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(deserialize_with = "lenient_string")]
    client_id: String,
    client_secret: Option<String>,
    name: Option<String>,
    client_name: Option<String>,
    description: Option<String>,
    redirect_uri: Option<String>,
    redirect_url: Option<String>,
    environment: Option<String>,
    client_status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    user_account_id: String,
    created_at: Option<String>,
}

impl From<ApplicationWire> for Application {
    fn from(wire: ApplicationWire) -> Self {
        let environment = wire
            .environment
            .as_deref()
            .and_then(Environment::parse)
            .unwrap_or_default();

        Application {
            id: wire.id,
            client_id: wire.client_id,
            client_secret: HIDDEN_SECRET.to_string(),
            name: non_empty(wire.name)
                .or_else(|| non_empty(wire.client_name))
                .unwrap_or_else(|| "Untitled application".to_string()),
            description: non_empty(wire.description)
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            redirect_uri: wire.redirect_uri.or(wire.redirect_url).unwrap_or_default(),
            environment,
            status: environment.status(),
            client_status: non_empty(wire.client_status).unwrap_or_else(|| "new".to_string()),
            user_account_id: wire.user_account_id,
            created_at: wire.created_at.as_deref().and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct KeyPairWire {
    #[serde(deserialize_with = "lenient_string")]
    record_id: String,
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    public_key: String,
    private_key: Option<String>,
    registration_date: Option<String>,
    last_rotation_at: Option<String>,
    last_rotation: Option<String>,
}

impl From<&KeyPairWire> for AppKeyPair {
    fn from(wire: &KeyPairWire) -> Self {
        AppKeyPair {
            record_id: first_id(wire.record_id.clone(), wire.id.clone()),
            public_key: wire.public_key.clone(),
            registration_date: wire.registration_date.as_deref().and_then(parse_timestamp),
            last_rotation_at: wire
                .last_rotation_at
                .as_deref()
                .or(wire.last_rotation.as_deref())
                .and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateApplicationBody<'a> {
    client_name: &'a str,
    description: &'a str,
    redirect_uri: &'a str,
    environment: &'a str,
    user_account_id: &'a str,
}

#[derive(Debug, Default, Serialize)]
struct UpdateApplicationBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    client_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RotateBody<'a> {
    client_id: &'a str,
    reason: &'a str,
}

#[derive(Debug, Deserialize)]
struct RotatedSecretWire {
    #[serde(default, deserialize_with = "lenient_string")]
    client_id: String,
    client_secret: Option<String>,
}

// --- Results carrying one-time values ---

/// Result of a create: the application plus its secret, shown once.
#[derive(Debug)]
pub struct CreatedApplication {
    pub application: Application,
    pub client_secret: Secret,
}

#[derive(Debug)]
pub struct RotatedSecret {
    pub client_id: String,
    pub client_secret: Secret,
}

#[derive(Debug)]
pub struct RotatedKeys {
    pub key_pair: AppKeyPair,
    /// Present when the backend returns the private half; shown once.
    pub private_key: Option<Secret>,
}

// --- Client ---

pub struct Applications<'a> {
    api: &'a ApiClient,
}

impl<'a> Applications<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Admins get the global listing; everyone else only their own.
    pub async fn list(
        &self,
        access_level: AccessLevel,
        user_id: &str,
    ) -> Result<Vec<Application>, PortalError> {
        let records: Vec<ApplicationWire> = match access_level {
            AccessLevel::Admin => self.api.get(&BASE, Retry::Never).await?,
            AccessLevel::Standard => {
                self.api
                    .get(&client_path(&["byuser", user_id]), Retry::Never)
                    .await?
            }
        };
        Ok(records.into_iter().map(Application::from).collect())
    }

    pub async fn get(&self, client_id: &str) -> Result<Application, PortalError> {
        let record: ApplicationWire = self
            .api
            .get(&client_path(&[client_id]), Retry::Configured)
            .await?;
        Ok(record.into())
    }

    /// The active key pair is the first one the backend lists.
    pub async fn get_app_keys(&self, client_id: &str) -> Result<Option<AppKeyPair>, PortalError> {
        let records: Vec<KeyPairWire> = self
            .api
            .get(&client_path(&["appkey", client_id]), Retry::Configured)
            .await?;
        Ok(records.first().map(AppKeyPair::from))
    }

    pub async fn create(
        &self,
        input: &NewApplication,
        owner_id: &str,
    ) -> Result<CreatedApplication, PortalError> {
        validate_new(input)?;

        let body = CreateApplicationBody {
            client_name: input.name.trim(),
            description: input.description.as_deref().unwrap_or(""),
            redirect_uri: input.redirect_uri.trim(),
            environment: input.environment.as_str(),
            user_account_id: owner_id,
        };

        let result: Result<CreatedApplication, PortalError> = async {
            let mut record: ApplicationWire = self.api.post(&BASE, &body).await?;
            let secret = record
                .client_secret
                .take()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    PortalError::InvalidResponseShape(
                        "created application has no client_secret".to_string(),
                    )
                })?;
            Ok(CreatedApplication {
                application: record.into(),
                client_secret: Secret::new(secret),
            })
        }
        .await;

        // A failed create always reaches the caller; no local stand-in.
        result.inspect_err(|e| tracing::warn!("Application create failed: {e}"))
    }

    pub async fn update(
        &self,
        id: &str,
        changes: &ApplicationUpdate,
    ) -> Result<Application, PortalError> {
        if let Some(uri) = changes.redirect_uri.as_deref() {
            validate_redirect_uri(uri)?;
        }
        let body = UpdateApplicationBody {
            client_name: changes.name.as_deref(),
            description: changes.description.as_deref(),
            redirect_uri: changes.redirect_uri.as_deref(),
            environment: changes.environment.map(|e| e.as_str()),
        };
        let record: ApplicationWire = self.api.put(&client_path(&[id]), &body).await?;
        Ok(record.into())
    }

    /// Irreversible.
    pub async fn delete(&self, id: &str) -> Result<(), PortalError> {
        let _: Value = self.api.delete(&client_path(&[id])).await?;
        Ok(())
    }

    pub async fn rotate_secret(
        &self,
        client_id: &str,
        reason: &str,
    ) -> Result<RotatedSecret, PortalError> {
        let body = RotateBody { client_id, reason };
        let record: RotatedSecretWire = self
            .api
            .post(&client_path(&["rotate-secret"]), &body)
            .await?;
        let secret = record
            .client_secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                PortalError::InvalidResponseShape("rotation returned no client_secret".to_string())
            })?;

        Ok(RotatedSecret {
            client_id: if record.client_id.is_empty() {
                client_id.to_string()
            } else {
                record.client_id
            },
            client_secret: Secret::new(secret),
        })
    }

    pub async fn rotate_keys(
        &self,
        client_id: &str,
        reason: &str,
    ) -> Result<RotatedKeys, PortalError> {
        let body = RotateBody { client_id, reason };
        let record: KeyPairWire = self
            .api
            .post(&client_path(&["rotate-keys"]), &body)
            .await?;
        if record.public_key.is_empty() {
            return Err(PortalError::InvalidResponseShape(
                "rotation returned no public_key".to_string(),
            ));
        }

        Ok(RotatedKeys {
            key_pair: AppKeyPair::from(&record),
            private_key: record
                .private_key
                .filter(|k| !k.is_empty())
                .map(Secret::new),
        })
    }
}

fn validate_new(input: &NewApplication) -> Result<(), PortalError> {
    if input.name.trim().is_empty() {
        return Err(PortalError::validation("name", "Application name is required"));
    }
    validate_redirect_uri(&input.redirect_uri)
}

fn validate_redirect_uri(uri: &str) -> Result<(), PortalError> {
    match reqwest::Url::parse(uri.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(PortalError::validation(
            "redirectUri",
            "Redirect URI must be an absolute http(s) URL",
        )),
    }
}
