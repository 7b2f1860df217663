pub mod adapter;
pub mod memory;
pub mod remote;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::models::{Connection, ConnectionPatch, NewConnection};

pub use adapter::ConnectionStore;
pub use memory::MemoryStore;
pub use remote::RemoteStore;

/// Abstraction over connection-record storage backends.
/// Implementations: RemoteStore (HTTP table API), MemoryStore (DashMap).
///
/// These are raw row operations. All credential mutation must go through
/// [`ConnectionStore`], which layers the backup/recovery procedure on top;
/// no other component may call `apply_patch` directly.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Connection>, GatewayError>;

    async fn list(&self) -> Result<Vec<Connection>, GatewayError>;

    async fn insert(&self, new: NewConnection) -> Result<Connection, GatewayError>;

    /// Apply a partial update. Absent patch fields should be left untouched,
    /// but not every backend honours that (some replace the whole row) —
    /// which is exactly why the adapter exists.
    async fn apply_patch(&self, id: Uuid, patch: &ConnectionPatch) -> Result<(), GatewayError>;
}
