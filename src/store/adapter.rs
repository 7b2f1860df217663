//! Credential store adapter — the only sanctioned mutation path for
//! connection credentials.
//!
//! Wraps any [`StoreBackend`] with two behaviors the raw backends do not
//! provide:
//! - fuzzy service lookup, tolerating the case and whitespace drift in
//!   upstream display names (a documented compatibility behavior, not an
//!   accident);
//! - a corruption-safe update procedure that backs up credentials before
//!   every write and restores them if the backend loses them, because not
//!   every backend applies patches per-field (some replace the whole row).

use std::sync::Arc;
use uuid::Uuid;

use super::StoreBackend;
use crate::errors::GatewayError;
use crate::models::{Connection, ConnectionPatch, NewConnection};

#[derive(Clone)]
pub struct ConnectionStore {
    backend: Arc<dyn StoreBackend>,
}

impl ConnectionStore {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Look up a connection by service key.
    ///
    /// 1. Exact case-insensitive match on the stored display name.
    /// 2. Whitespace-stripped bidirectional substring match.
    /// 3. Absent.
    ///
    /// Duplicate rows per service are tolerated: first match wins.
    pub async fn get(&self, service_type: &str) -> Result<Option<Connection>, GatewayError> {
        let all = self.backend.list().await?;
        let wanted = service_type.trim().to_lowercase();

        if let Some(found) = all.iter().find(|c| c.name.to_lowercase() == wanted) {
            return Ok(Some(found.clone()));
        }

        let squashed = strip_whitespace(&wanted);
        if squashed.is_empty() {
            return Ok(None);
        }
        for candidate in &all {
            let name = strip_whitespace(&candidate.name.to_lowercase());
            if !name.is_empty() && (name.contains(&squashed) || squashed.contains(&name)) {
                return Ok(Some(candidate.clone()));
            }
        }
        Ok(None)
    }

    pub async fn get_all(&self) -> Result<Vec<Connection>, GatewayError> {
        self.backend.list().await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Connection>, GatewayError> {
        self.backend.get_by_id(id).await
    }

    pub async fn create(&self, new: NewConnection) -> Result<Connection, GatewayError> {
        self.backend.insert(new).await
    }

    /// Invariant-preserving partial update.
    ///
    /// Credentials are snapshotted before the write. The incoming patch is
    /// sanitized: a toggle-only patch never carries credentials, and an
    /// empty credentials map is dropped (in practice that pattern is an
    /// upstream bug, not intent to clear secrets). After the write the row
    /// is re-read; if credentials vanished they are restored from the
    /// snapshot. On write failure the snapshot is rewritten before the
    /// original error is re-raised.
    pub async fn update(
        &self,
        id: Uuid,
        patch: ConnectionPatch,
    ) -> Result<Connection, GatewayError> {
        let existing = self
            .backend
            .get_by_id(id)
            .await?
            .ok_or(GatewayError::NotFound(id))?;
        let backup = existing.credentials.clone();

        let mut patch = patch;
        if patch.is_toggle_only() {
            patch.credentials = None;
        } else if matches!(&patch.credentials, Some(c) if c.is_empty()) {
            tracing::warn!(
                %id,
                service = %existing.service_type,
                "dropping empty credentials from update"
            );
            patch.credentials = None;
        }

        if let Err(write_err) = self.backend.apply_patch(id, &patch).await {
            if !backup.is_empty() {
                tracing::error!(
                    %id,
                    service = %existing.service_type,
                    error = %write_err,
                    "update failed, rewriting credentials from backup"
                );
                if let Err(restore_err) = self
                    .backend
                    .apply_patch(id, &ConnectionPatch::credentials_only(backup))
                    .await
                {
                    tracing::error!(%id, error = %restore_err, "credential restore failed");
                }
            }
            return Err(write_err);
        }

        let mut updated = self
            .backend
            .get_by_id(id)
            .await?
            .ok_or(GatewayError::NotFound(id))?;

        // Lost-write anomaly: the write succeeded but the backend dropped
        // the credentials field. Self-heal from the snapshot.
        if updated.credentials.is_empty() && !backup.is_empty() {
            tracing::warn!(
                %id,
                service = %updated.service_type,
                "credentials lost on write, restoring from backup"
            );
            self.backend
                .apply_patch(id, &ConnectionPatch::credentials_only(backup))
                .await
                .map_err(|e| {
                    GatewayError::StoreWrite(format!("credential restore after lost write: {}", e))
                })?;
            updated = self
                .backend
                .get_by_id(id)
                .await?
                .ok_or(GatewayError::NotFound(id))?;
        }

        Ok(updated)
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

// ── Tests ──────────────────────────────────────────────────────
