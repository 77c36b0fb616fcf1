use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::PortalError;

/// The backend's `{success, data, resp_msg}` wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub resp_msg: Option<String>,
}

/// Decodes a 2xx body into its payload.
///
/// `success` must be `true` and `data` must be present and non-null; anything
/// else is a contract violation, never an empty success.
pub fn decode<T: DeserializeOwned>(body: Value) -> Result<T, PortalError> {
    let envelope: Envelope = serde_json::from_value(body)
        .map_err(|e| PortalError::InvalidResponseShape(format!("not an envelope: {e}")))?;

    match (envelope.success, envelope.data) {
        (Some(true), Some(data)) if !data.is_null() => serde_json::from_value(data)
            .map_err(|e| PortalError::InvalidResponseShape(format!("unexpected payload: {e}"))),
        (Some(true), _) => Err(PortalError::InvalidResponseShape(
            "envelope has no data".to_string(),
        )),
        (_, _) => Err(PortalError::InvalidResponseShape(
            envelope
                .resp_msg
                .unwrap_or_else(|| "envelope reports success=false".to_string()),
        )),
    }
}

/// Best-effort message from an error body: `resp_msg`, then `message`.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["resp_msg", "message", "error"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
