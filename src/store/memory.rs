//! In-memory connection backend.
//!
//! Used by tests and by mock-only deployments that run without a remote
//! store configured.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::StoreBackend;
use crate::errors::GatewayError;
use crate::models::{Connection, ConnectionPatch, NewConnection};

#[derive(Default)]
pub struct MemoryStore {
    rows: DashMap<Uuid, Connection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: simulate a backend that lost the credentials field on an
    /// unrelated write.
    #[cfg(test)]
    pub fn wipe_credentials(&self, id: Uuid) {
        if let Some(mut row) = self.rows.get_mut(&id) {
            row.credentials.clear();
        }
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Connection>, GatewayError> {
        Ok(self.rows.get(&id).map(|row| row.value().clone()))
    }

    async fn list(&self) -> Result<Vec<Connection>, GatewayError> {
        Ok(self.rows.iter().map(|row| row.value().clone()).collect())
    }

    async fn insert(&self, new: NewConnection) -> Result<Connection, GatewayError> {
        let row = Connection {
            id: Uuid::new_v4(),
            name: new.name,
            service_type: new.service_type,
            is_connected: new.is_connected,
            is_mock: new.is_mock,
            credentials: new.credentials,
            last_connected: None,
            created_at: Utc::now(),
        };
        self.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn apply_patch(&self, id: Uuid, patch: &ConnectionPatch) -> Result<(), GatewayError> {
        let mut row = self.rows.get_mut(&id).ok_or(GatewayError::NotFound(id))?;
        if let Some(name) = &patch.name {
            row.name = name.clone();
        }
        if let Some(is_connected) = patch.is_connected {
            row.is_connected = is_connected;
        }
        if let Some(is_mock) = patch.is_mock {
            row.is_mock = is_mock;
        }
        if let Some(credentials) = &patch.credentials {
            row.credentials = credentials.clone();
        }
        if let Some(last_connected) = patch.last_connected {
            row.last_connected = Some(last_connected);
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────
