use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::envelope;
use crate::error::{ErrorKind, PortalError};
use crate::session::Session;

/// Whether a read may be re-attempted after a network failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    Never,
    Configured,
}

/// HTTP transport shared by every resource client.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
    session: Session,
    read_retries: u32,
}

impl ApiClient {
    pub fn new(config: &Config, session: Session) -> Result<Self, PortalError> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| PortalError::Config(format!("Invalid API base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(PortalError::Config(format!(
                "API base URL cannot carry paths: {base_url}"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            base_url,
            http,
            session,
            read_retries: config.read_retries,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        retry: Retry,
    ) -> Result<T, PortalError> {
        let attempts = match retry {
            Retry::Never => 1,
            Retry::Configured => 1 + self.read_retries,
        };
        self.send(Method::GET, segments, None, attempts).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, PortalError> {
        self.send(Method::POST, segments, Some(serde_json::to_value(body)?), 1)
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, PortalError> {
        self.send(Method::PUT, segments, Some(serde_json::to_value(body)?), 1)
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, PortalError> {
        let body = body.map(serde_json::to_value).transpose()?;
        self.send(Method::PATCH, segments, body, 1).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, PortalError> {
        self.send(Method::DELETE, segments, None, 1).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
        attempts: u32,
    ) -> Result<T, PortalError> {
        let url = self.endpoint(segments);
        let mut last_error = None;

        for attempt in 0..attempts.max(1) {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(100 * (1 << (attempt - 1)))).await;
            }
            tracing::debug!(%method, path = url.path(), attempt, "backend request");

            match self.send_once(method.clone(), url.clone(), body.as_ref()).await {
                Ok(payload) => return envelope::decode(payload),
                Err(e) => {
                    if e.is_unauthorized() {
                        tracing::info!("Backend rejected the session token, signing out");
                        if let Err(clear) = self.session.clear().await {
                            tracing::warn!("Failed to clear session: {clear}");
                        }
                        return Err(e);
                    }
                    if !is_retryable(&e) {
                        return Err(e);
                    }
                    tracing::debug!(path = url.path(), attempt, "request failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| PortalError::InvalidResponseShape("no response".to_string())))
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, PortalError> {
        let mut request = self.http.request(method, url).headers(self.session.headers());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = envelope::error_message(&text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
            return Err(PortalError::RequestFailed { status, message });
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| PortalError::InvalidResponseShape(format!("body is not JSON: {e}")))
    }
}

fn is_retryable(error: &PortalError) -> bool {
    match error {
        PortalError::RequestFailed { status, .. } => {
            status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
        }
        other => other.kind() == ErrorKind::Network,
    }
}
