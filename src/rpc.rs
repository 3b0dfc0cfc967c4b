//! # Gasless Relay HTTP surface
//!
//! The three operations consumed by the UI:
//!
//! - `GET /gasless/check/{address}/{chain_id}` — whether the account can go
//!   through the gasless flow, and who it delegates to.
//! - `POST /gasless/prepare` — build a sponsored ERC-4337 v0.7 user operation
//!   from a call bundle and return the digest the user must sign.
//! - `POST /gasless/submit` — attach the user's signature to a prepared
//!   operation, hand it to the bundler and track it to a receipt.

use crate::{
    chains::{Chain, Chains},
    config::GaslessMethod,
    constants::{
        DRAFT_CALL_GAS_LIMIT, DRAFT_PRE_VERIFICATION_GAS, DRAFT_VERIFICATION_GAS_LIMIT,
        DUMMY_SIGNATURE, RPC_CALL_TIMEOUT,
    },
    error::RelayError,
    storage::{PendingOperation, RelayStorage, StorageApi},
    types::{
        IEntryPoint, UserOperation, encode_execute,
        rpc::{
            CheckResponse, PrepareParameters, PrepareResponse, SubmitParameters, SubmitResponse,
        },
    },
};
use alloy::{
    eips::eip7702::constants::EIP7702_DELEGATION_DESIGNATOR,
    primitives::{Address, ChainId, U256, aliases::U192},
    providers::Provider,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use std::{future::IntoFuture, sync::Arc};
use tracing::{info, instrument, warn};

/// Bounds a single provider call so a stalled node fails the request instead
/// of hanging the handler.
async fn bounded_rpc<T>(
    operation: &'static str,
    fut: impl IntoFuture<Output = T>,
) -> Result<T, RelayError> {
    tokio::time::timeout(RPC_CALL_TIMEOUT, fut)
        .await
        .map_err(|_| RelayError::RpcTimeout(operation))
}

/// Extracts the delegation target from EIP-7702 designator code.
///
/// Returns the 20 bytes following the `0xef0100` prefix, or `None` when the
/// code is empty, carries no designator, or is truncated.
pub fn delegated_to(code: &[u8]) -> Option<Address> {
    let target = code.strip_prefix(EIP7702_DELEGATION_DESIGNATOR.as_ref())?;
    (target.len() >= 20).then(|| Address::from_slice(&target[..20]))
}

/// The gasless relay orchestrator.
#[derive(Debug, Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

#[derive(Debug)]
struct RelayInner {
    chains: Chains,
    storage: RelayStorage,
}

impl Relay {
    /// Create a new relay over the given chains and pending-operation store.
    pub fn new(chains: Chains, storage: RelayStorage) -> Self {
        Self { inner: Arc::new(RelayInner { chains, storage }) }
    }

    /// Builds the HTTP router for the relay surface.
    pub fn into_router(self) -> Router {
        Router::new()
            .route("/gasless/check/{address}/{chain_id}", get(check))
            .route("/gasless/prepare", post(prepare))
            .route("/gasless/submit", post(submit))
            .with_state(self)
    }

    fn chain(&self, chain_id: ChainId) -> Result<&Chain, RelayError> {
        self.inner.chains.get(chain_id).ok_or(RelayError::UnsupportedChain(chain_id))
    }

    /// Whether `address` can go through the gasless flow on `chain_id`.
    ///
    /// An unsupported chain is reported in-band as a disabled account rather
    /// than an error; only transport failures escape.
    pub async fn check(
        &self,
        address: Address,
        chain_id: ChainId,
    ) -> Result<CheckResponse, RelayError> {
        let Ok(chain) = self.chain(chain_id) else {
            return Ok(CheckResponse {
                enabled: false,
                delegator: None,
                chain: None,
                error: Some("Unsupported chain".into()),
            });
        };

        let code = bounded_rpc("account code query", chain.provider.get_code_at(address)).await??;
        let delegator = match chain.config.method {
            GaslessMethod::Eip7702 => delegated_to(&code),
            GaslessMethod::Erc4337 => None,
        };
        let enabled = match chain.config.method {
            GaslessMethod::Eip7702 => delegator.is_some(),
            GaslessMethod::Erc4337 => !code.is_empty(),
        };

        Ok(CheckResponse {
            enabled,
            delegator,
            chain: Some(chain.config.name.clone()),
            error: None,
        })
    }

    /// Builds a sponsored user operation for the given call bundle.
    ///
    /// On success the operation is parked awaiting the user's signature and
    /// the returned hash is the digest to sign. Any step failing leaves no
    /// partial state behind: the store is only written as the final step.
    #[instrument(skip(self, params), fields(sender = %params.address, chain_id = params.chain_id))]
    pub async fn prepare(&self, params: PrepareParameters) -> Result<PrepareResponse, RelayError> {
        let PrepareParameters { address: sender, chain_id, calls } = params;
        let chain = self.chain(chain_id)?;
        let entry_point = chain.config.entry_point;

        let code = bounded_rpc("account code query", chain.provider.get_code_at(sender)).await??;
        let enabled = match chain.config.method {
            GaslessMethod::Eip7702 => delegated_to(&code).is_some(),
            GaslessMethod::Erc4337 => !code.is_empty(),
        };
        if !enabled {
            return Err(RelayError::DelegationMissing(sender));
        }

        let entry_point_contract = IEntryPoint::new(entry_point, &chain.provider);
        let get_nonce = entry_point_contract.getNonce(sender, U192::ZERO);
        let nonce = bounded_rpc("entry point nonce query", get_nonce.call()).await??;
        let fees = chain.bundler.gas_price().await?.fast;

        let mut op = UserOperation {
            sender,
            nonce,
            call_data: encode_execute(&calls),
            call_gas_limit: U256::from(DRAFT_CALL_GAS_LIMIT),
            verification_gas_limit: U256::from(DRAFT_VERIFICATION_GAS_LIMIT),
            pre_verification_gas: U256::from(DRAFT_PRE_VERIFICATION_GAS),
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            signature: DUMMY_SIGNATURE.clone(),
            ..Default::default()
        };

        // The paymaster is authoritative for gas limits once it sponsors.
        let sponsorship = chain.bundler.sponsor_user_operation(&op, entry_point).await?;
        sponsorship.apply(&mut op);

        let user_op_hash = op.compute_hash(entry_point, chain_id)?;
        let op_id = self
            .inner
            .storage
            .put_pending_op(PendingOperation {
                user_op: op.clone(),
                user_op_hash,
                chain_id,
                sender,
            })
            .await;

        info!(%op_id, %user_op_hash, calls = calls.len(), "prepared sponsored user operation");

        Ok(PrepareResponse {
            success: true,
            op_id,
            user_op: op,
            user_op_hash,
            chain_id,
            message: "Sign this hash in your wallet".into(),
        })
    }

    /// Attaches the user's signature to a prepared operation and submits it.
    ///
    /// The pending entry is consumed read-once up front, so a replayed or
    /// expired id fails before anything reaches the bundler. The response
    /// reports the hash the user signed; if the bundler tracks the submission
    /// under a different hash, the receipt poll keys on the bundler's value
    /// but the body stays consistent with what prepare returned.
    #[instrument(skip(self, params), fields(op_id = %params.op_id))]
    pub async fn submit(&self, params: SubmitParameters) -> Result<SubmitResponse, RelayError> {
        let pending = self
            .inner
            .storage
            .take_pending_op(params.op_id)
            .await
            .ok_or(RelayError::OperationExpiredOrUnknown)?;

        let chain = self.chain(pending.chain_id)?;
        let mut op = pending.user_op;
        op.signature = params.signature;

        let bundler_hash =
            chain.bundler.send_user_operation(&op, chain.config.entry_point).await?;
        if bundler_hash != pending.user_op_hash {
            // The user signed our hash; a bundler tracking a different one
            // means the codec and the bundler disagree on the encoding.
            warn!(
                ours = %pending.user_op_hash,
                bundler = %bundler_hash,
                "user operation hash mismatch with bundler"
            );
        }
        let user_op_hash = pending.user_op_hash;

        info!(%user_op_hash, sender = %pending.sender, "user operation accepted by bundler");

        match chain.bundler.wait_for_receipt_default(bundler_hash).await? {
            Some(receipt) if receipt.success => {
                let tx_hash = receipt.receipt.transaction_hash;
                info!(%tx_hash, "user operation confirmed");
                Ok(SubmitResponse::confirmed(user_op_hash, tx_hash, chain.config.tx_url(tx_hash)))
            }
            Some(receipt) => {
                // Included, but the account's calls reverted. Distinct from
                // both rejection and timeout.
                let tx_hash = receipt.receipt.transaction_hash;
                warn!(%tx_hash, "user operation included but reverted on-chain");
                Ok(SubmitResponse::reverted(user_op_hash, tx_hash, chain.config.tx_url(tx_hash)))
            }
            None => {
                warn!(%user_op_hash, "no receipt within the wait bound, reporting as pending");
                Ok(SubmitResponse::pending(user_op_hash))
            }
        }
    }
}

async fn check(
    State(relay): State<Relay>,
    Path((address, chain_id)): Path<(Address, ChainId)>,
) -> Result<Json<CheckResponse>, RelayError> {
    Ok(Json(relay.check(address, chain_id).await?))
}

async fn prepare(
    State(relay): State<Relay>,
    Json(params): Json<PrepareParameters>,
) -> Result<Json<PrepareResponse>, RelayError> {
    Ok(Json(relay.prepare(params).await?))
}

async fn submit(
    State(relay): State<Relay>,
    Json(params): Json<SubmitParameters>,
) -> Result<Json<SubmitResponse>, RelayError> {
    Ok(Json(relay.submit(params).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::bytes;

    #[test]
    fn designator_with_zero_target_is_delegated() {
        let mut code = EIP7702_DELEGATION_DESIGNATOR.to_vec();
        code.extend_from_slice(&[0u8; 20]);
        assert_eq!(delegated_to(&code), Some(Address::ZERO));
    }

    #[test]
    fn designator_returns_the_following_twenty_bytes() {
        let target = Address::repeat_byte(0x42);
        let mut code = EIP7702_DELEGATION_DESIGNATOR.to_vec();
        code.extend_from_slice(target.as_slice());
        assert_eq!(delegated_to(&code), Some(target));
    }

    #[test]
    fn empty_code_is_not_delegated() {
        assert_eq!(delegated_to(&[]), None);
    }

    #[test]
    fn truncated_designator_is_not_delegated() {
        let mut code = EIP7702_DELEGATION_DESIGNATOR.to_vec();
        code.extend_from_slice(&[0u8; 19]);
        assert_eq!(delegated_to(&code), None);
    }

    #[test]
    fn plain_contract_code_is_not_delegated() {
        assert_eq!(delegated_to(&bytes!("0x6080604052")), None);
    }
}
