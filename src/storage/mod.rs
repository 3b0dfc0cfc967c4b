//! Relay storage.

mod api;
pub use api::{PendingOperation, StorageApi};
mod memory;
pub use memory::InMemoryStorage;

use crate::{constants::PENDING_OP_TTL, types::OpId};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

/// Relay storage handle.
///
/// Owned by the orchestrator, created at service start and dropped at
/// shutdown; no component reaches pending state any other way.
#[derive(Debug, Clone)]
pub struct RelayStorage {
    inner: Arc<dyn StorageApi>,
}

impl RelayStorage {
    /// Creates [`RelayStorage`] with an in-memory backend and the default
    /// signature-wait TTL.
    pub fn in_memory() -> Self {
        Self::in_memory_with_ttl(PENDING_OP_TTL)
    }

    /// Creates [`RelayStorage`] with an in-memory backend and a custom TTL.
    pub fn in_memory_with_ttl(ttl: Duration) -> Self {
        Self { inner: Arc::new(InMemoryStorage::new(ttl)) }
    }
}

#[async_trait]
impl StorageApi for RelayStorage {
    async fn put_pending_op(&self, op: PendingOperation) -> OpId {
        self.inner.put_pending_op(op).await
    }

    async fn take_pending_op(&self, id: OpId) -> Option<PendingOperation> {
        self.inner.take_pending_op(id).await
    }

    async fn sweep_expired(&self) {
        self.inner.sweep_expired().await
    }

    async fn pending_count(&self) -> usize {
        self.inner.pending_count().await
    }
}
