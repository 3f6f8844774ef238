//! Remote response types
//!
//! Remote calls never raise: they return either the parsed JSON payload or an
//! [`ApiFailure`] sentinel whose `message` is always [`NETWORK_ERROR`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message carried by every remote failure
pub const NETWORK_ERROR: &str = "Network Error";

/// Non-throwing failure marker for a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiFailure {
    pub message: String,
    /// HTTP status when the server answered, `None` for transport failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Server-provided text or transport error description
    #[serde(default)]
    pub detail: String,
}

impl ApiFailure {
    pub fn transport(detail: impl Into<String>) -> Self {
        Self {
            message: NETWORK_ERROR.to_string(),
            status: None,
            detail: detail.into(),
        }
    }

    pub fn status(status: u16, detail: impl Into<String>) -> Self {
        Self {
            message: NETWORK_ERROR.to_string(),
            status: Some(status),
            detail: detail.into(),
        }
    }

    pub fn is_network_error(&self) -> bool {
        self.message == NETWORK_ERROR
    }

    /// The server answered and said the item does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self.status, Some(404) | Some(410))
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {}): {}", self.message, status, self.detail),
            None => write!(f, "{}: {}", self.message, self.detail),
        }
    }
}

pub type RemoteResult = Result<Value, ApiFailure>;

/// Normalize a collection payload into a list of objects.
///
/// Arrays are taken as-is, a lone object becomes a one-element list. Anything
/// else is not a usable payload.
pub fn into_items(payload: Value) -> Option<Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(_) => Some(vec![payload]),
        _ => None,
    }
}
