use serde::{Deserialize, Serialize};

use super::user_accounts::UserAccountWire;
use crate::api::ApiClient;
use crate::error::PortalError;
use crate::session::{SessionUser, StoredSession};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TokenWire {
    token: Option<String>,
    access_token: Option<String>,
    user: Option<UserAccountWire>,
    user_account: Option<UserAccountWire>,
}

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct SignupBody<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct GoogleBody<'a> {
    credential: &'a str,
}

/// Sign-in endpoints. Every success replaces the persisted session.
pub struct Auth<'a> {
    api: &'a ApiClient,
}

impl<'a> Auth<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Option<SessionUser>, PortalError> {
        if email.trim().is_empty() {
            return Err(PortalError::validation("email", "Email is required"));
        }
        if password.is_empty() {
            return Err(PortalError::validation("password", "Password is required"));
        }
        let body = LoginBody {
            email: email.trim(),
            password,
        };
        self.establish(&["auth", "users", "login"], &body).await
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<Option<SessionUser>, PortalError> {
        if request.email.trim().is_empty() {
            return Err(PortalError::validation("email", "Email is required"));
        }
        if request.password.len() < 8 {
            return Err(PortalError::validation(
                "password",
                "Password must be at least 8 characters",
            ));
        }
        let body = SignupBody {
            first_name: request.first_name.trim(),
            last_name: request.last_name.trim(),
            email: request.email.trim(),
            password: &request.password,
        };
        self.establish(&["auth", "users", "create"], &body).await
    }

    pub async fn google(&self, credential: &str) -> Result<Option<SessionUser>, PortalError> {
        self.establish(&["auth", "google"], &GoogleBody { credential })
            .await
    }

    pub async fn google_signup(&self, credential: &str) -> Result<Option<SessionUser>, PortalError> {
        self.establish(&["auth", "google", "signup"], &GoogleBody { credential })
            .await
    }

    async fn establish<B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<Option<SessionUser>, PortalError> {
        let issued: TokenWire = self.api.post(segments, body).await?;
        let Some(token) = issued
            .token
            .or(issued.access_token)
            .filter(|t| !t.is_empty())
        else {
            return Err(PortalError::InvalidResponseShape(
                "sign-in returned an empty token".to_string(),
            ));
        };

        let user = issued.user.or(issued.user_account).map(SessionUser::from);
        self.api
            .session()
            .set(StoredSession {
                token,
                user: user.clone(),
            })
            .await?;
        tracing::info!(user = ?user.as_ref().map(|u| &u.id), "signed in");
        Ok(user)
    }
}
