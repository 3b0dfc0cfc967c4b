//! Pending operation storage in process memory.

use super::api::{PendingOperation, StorageApi};
use crate::types::OpId;
use alloy::primitives::B256;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// A stored operation with its creation time.
#[derive(Debug, Clone)]
struct StoredOp {
    op: PendingOperation,
    created_at: Instant,
}

/// [`StorageApi`] implementation over a [`DashMap`].
///
/// Entry-level atomicity of the map gives at-most-once consumption: of two
/// concurrent takes for the same id, exactly one gets the record.
#[derive(Debug)]
pub struct InMemoryStorage {
    ops: DashMap<OpId, StoredOp>,
    ttl: Duration,
}

impl InMemoryStorage {
    /// Creates a store whose entries expire `ttl` after insertion.
    pub fn new(ttl: Duration) -> Self {
        Self { ops: DashMap::new(), ttl }
    }

    fn expired(&self, stored: &StoredOp) -> bool {
        stored.created_at.elapsed() > self.ttl
    }
}

#[async_trait]
impl StorageApi for InMemoryStorage {
    async fn put_pending_op(&self, op: PendingOperation) -> OpId {
        // Opportunistic eviction keeps the map bounded without a background
        // task.
        self.sweep_expired().await;

        let id = OpId::from(B256::random());
        self.ops.insert(id, StoredOp { op, created_at: Instant::now() });
        id
    }

    async fn take_pending_op(&self, id: OpId) -> Option<PendingOperation> {
        let (_, stored) = self.ops.remove(&id)?;
        if self.expired(&stored) {
            debug!(%id, "discarding expired pending operation on take");
            return None;
        }
        Some(stored.op)
    }

    async fn sweep_expired(&self) {
        self.ops.retain(|_, stored| stored.created_at.elapsed() <= self.ttl);
    }

    async fn pending_count(&self) -> usize {
        self.ops.len()
    }
}
