use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Error taxonomy of the gateway core.
///
/// Transport failures are handled locally by the fallback chain and only
/// escalate once both paths are exhausted; credential-integrity failures are
/// handled by the store's recovery procedure and escalate only if recovery
/// itself fails. Public dispatch entry points convert every variant into a
/// failure `CommandResult` — callers never see a raised error.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("connection {0} not found")]
    NotFound(Uuid),

    #[error("service '{service}' is not connected")]
    NotConnected { service: String },

    #[error("incomplete credentials for '{service}': missing {missing}")]
    IncompleteCredentials { service: String, missing: String },

    #[error("primary transport failed: {0}")]
    PrimaryTransport(String),

    #[error("secondary transport failed: {0}")]
    SecondaryTransport(String),

    #[error("store write failed: {0}")]
    StoreWrite(String),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl GatewayError {
    /// Stable machine-readable code, used in `CommandResult.error` and in
    /// admin API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::NotFound(_) => "not_found",
            GatewayError::NotConnected { .. } => "not_connected",
            GatewayError::IncompleteCredentials { .. } => "incomplete_credentials",
            GatewayError::PrimaryTransport(_) => "primary_transport_failed",
            GatewayError::SecondaryTransport(_) => "secondary_transport_failed",
            GatewayError::StoreWrite(_) => "store_write_failed",
            GatewayError::Store(_) => "store_error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_type, msg) = match &self {
            GatewayError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "invalid_request_error", self.to_string())
            }
            GatewayError::NotConnected { .. } => {
                (StatusCode::CONFLICT, "state_error", self.to_string())
            }
            GatewayError::IncompleteCredentials { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_request_error",
                self.to_string(),
            ),
            GatewayError::PrimaryTransport(_) | GatewayError::SecondaryTransport(_) => {
                (StatusCode::BAD_GATEWAY, "transport_error", self.to_string())
            }
            GatewayError::StoreWrite(e) => {
                tracing::error!("store write error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
            GatewayError::Store(e) => {
                tracing::error!("store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": self.code(),
            }
        }));

        (status, body).into_response()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(GatewayError::NotFound(Uuid::nil()).code(), "not_found");
        assert_eq!(
            GatewayError::NotConnected { service: "github".into() }.code(),
            "not_connected"
        );
        assert_eq!(
            GatewayError::PrimaryTransport("boom".into()).code(),
            "primary_transport_failed"
        );
    }

    #[test]
    fn test_display_includes_context() {
        let err = GatewayError::IncompleteCredentials {
            service: "klaviyo".into(),
            missing: "api_key".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("klaviyo"));
        assert!(msg.contains("api_key"));
    }
}
