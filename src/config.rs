use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::PortalError;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub timeout: Duration,
    /// Extra attempts for reads that opt into retrying. Writes never retry.
    pub read_retries: u32,
    /// Show a clearly marked placeholder when secret rotation fails.
    pub placeholder_secret_on_failure: bool,
    /// CLI log lines as JSON instead of the human format.
    pub json_logs: bool,
    pub user_agent: String,
}

impl Config {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            session_file: PathBuf::from(".devportal/session.json"),
            timeout: Duration::from_secs(30),
            read_retries: 1,
            placeholder_secret_on_failure: true,
            json_logs: false,
            user_agent: format!("dev-portal/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn from_env() -> Result<Self, PortalError> {
        let base_url = env::var("PORTAL_API_BASE_URL")
            .map_err(|_| PortalError::Config("PORTAL_API_BASE_URL is not set".to_string()))?;

        let mut config = Self::new(base_url);
        if let Ok(path) = env::var("PORTAL_SESSION_FILE") {
            config.session_file = PathBuf::from(path);
        }
        config.timeout = Duration::from_secs(
            env::var("PORTAL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        );
        config.read_retries = env::var("PORTAL_READ_RETRIES")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .unwrap_or(1);
        config.placeholder_secret_on_failure = env::var("PORTAL_PLACEHOLDER_SECRET_ON_FAILURE")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);
        config.json_logs = env::var("PORTAL_LOG_FORMAT")
            .map(|v| v.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(config)
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_read_retries(mut self, retries: u32) -> Self {
        self.read_retries = retries;
        self
    }

    pub fn with_placeholder_secret_on_failure(mut self, enabled: bool) -> Self {
        self.placeholder_secret_on_failure = enabled;
        self
    }

    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }
}
