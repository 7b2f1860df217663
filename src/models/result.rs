//! The uniform result contract returned by every dispatch path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::GatewayError;

/// Outcome of a logical command, regardless of which transport served it.
///
/// Serialized field names are part of the contract consumed by the HTTP
/// route layer: `{success, data?, message?, error?}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn ok_with_message(data: Value, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn fail_with_error(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            error: Some(error.into()),
        }
    }
}

impl From<GatewayError> for CommandResult {
    fn from(err: GatewayError) -> Self {
        CommandResult::fail_with_error(err.to_string(), err.code())
    }
}

// ── Tests ──────────────────────────────────────────────────────
