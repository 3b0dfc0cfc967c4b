//! Pending operation storage api.

use crate::types::{OpId, UserOperation};
use alloy::primitives::{Address, B256, ChainId};
use async_trait::async_trait;
use std::fmt::Debug;

/// An operation that has been prepared and sponsored, awaiting the user's
/// signature.
///
/// Owned exclusively by the store between `put` and `take`: created by
/// prepare, consumed read-once by submit, or evicted after the TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    /// The sponsored, unsigned user operation.
    pub user_op: UserOperation,
    /// The digest the user is signing.
    pub user_op_hash: B256,
    /// The chain the operation targets.
    pub chain_id: ChainId,
    /// The delegated account.
    pub sender: Address,
}

/// Storage API for operations awaiting a signature.
///
/// The relay only ships a process-memory implementation; this seam exists so
/// a deployment can externalize pending state to a shared store without
/// touching the orchestrator.
#[async_trait]
pub trait StorageApi: Debug + Send + Sync {
    /// Stores `op` under a freshly generated id, stamping its creation time.
    async fn put_pending_op(&self, op: PendingOperation) -> OpId;

    /// Atomically reads and removes the operation.
    ///
    /// Returns `None` for ids that were never issued, already consumed, or
    /// whose entry outlived the TTL — expiry is enforced on read, so entries
    /// are unavailable past their TTL even if never swept.
    async fn take_pending_op(&self, id: OpId) -> Option<PendingOperation>;

    /// Evicts all entries past their TTL.
    async fn sweep_expired(&self);

    /// Number of operations currently awaiting a signature.
    async fn pending_count(&self) -> usize;
}
