//! Connection records — one per external SaaS service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Opaque vendor-specific credential mapping. The gateway core never
/// interprets its keys; only the owning service client validates them.
pub type CredentialMap = HashMap<String, String>;

/// One stored connection to an external service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub id: Uuid,
    /// Display label. Upstream sources are inconsistent about casing and
    /// whitespace, which is why lookups are fuzzy (see the store adapter).
    pub name: String,
    /// Lowercase vendor key, e.g. "github", "klaviyo". Immutable after
    /// creation — there is deliberately no patch field for it.
    pub service_type: String,
    pub is_connected: bool,
    pub is_mock: bool,
    #[serde(default)]
    pub credentials: CredentialMap,
    pub last_connected: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a connection. `id` and `created_at` are
/// assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConnection {
    pub name: String,
    pub service_type: String,
    pub is_connected: bool,
    pub is_mock: bool,
    #[serde(default)]
    pub credentials: CredentialMap,
}

/// Partial update applied to a connection. Absent fields are left untouched
/// by well-behaved backends; the store adapter defends against backends that
/// replace the whole row instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_connected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mock: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected: Option<DateTime<Utc>>,
}

impl ConnectionPatch {
    /// True when the populated field set is exactly `{is_connected}`.
    /// Toggle-only updates must never carry credentials to the backend.
    pub fn is_toggle_only(&self) -> bool {
        self.is_connected.is_some()
            && self.name.is_none()
            && self.is_mock.is_none()
            && self.credentials.is_none()
            && self.last_connected.is_none()
    }

    /// Patch that rewrites only the credentials field, used by the store's
    /// backup-recovery step.
    pub fn credentials_only(credentials: CredentialMap) -> Self {
        Self {
            credentials: Some(credentials),
            ..Self::default()
        }
    }

    pub fn connected(is_connected: bool) -> Self {
        Self {
            is_connected: Some(is_connected),
            ..Self::default()
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_only_classification() {
        assert!(ConnectionPatch::connected(false).is_toggle_only());

        let with_creds = ConnectionPatch {
            is_connected: Some(true),
            credentials: Some(CredentialMap::new()),
            ..ConnectionPatch::default()
        };
        assert!(!with_creds.is_toggle_only());

        assert!(!ConnectionPatch::default().is_toggle_only());
        assert!(!ConnectionPatch {
            name: Some("x".into()),
            is_connected: Some(true),
            ..ConnectionPatch::default()
        }
        .is_toggle_only());
    }

    #[test]
    fn test_patch_serializes_only_populated_fields() {
        let patch = ConnectionPatch::connected(true);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "is_connected": true }));
    }

    #[test]
    fn test_connection_roundtrip() {
        let mut credentials = CredentialMap::new();
        credentials.insert("token".into(), "abc".into());
        let conn = Connection {
            id: Uuid::new_v4(),
            name: "GitHub".into(),
            service_type: "github".into(),
            is_connected: true,
            is_mock: false,
            credentials,
            last_connected: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&conn).unwrap();
        let back: Connection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, conn);
    }
}
