//! Bundler and paymaster JSON-RPC client.
//!
//! Managed bundler endpoints expose both services behind a single URL:
//! `pm_sponsorUserOperation` and `pimlico_getUserOperationGasPrice` on the
//! paymaster side, `eth_sendUserOperation` and `eth_getUserOperationReceipt`
//! on the bundler side.

use crate::{
    constants::{RECEIPT_POLL_INTERVAL, RECEIPT_TIMEOUT, RPC_CALL_TIMEOUT},
    error::RelayError,
    types::UserOperation,
};
use alloy::{
    primitives::{Address, B256, Bytes, TxHash, U256},
    rpc::client::{ClientBuilder, RpcClient},
    transports::{RpcError, TransportErrorKind},
};
use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};
use tokio::time::MissedTickBehavior;
use tracing::debug;
use url::Url;

/// Fee values for one gas price tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasFees {
    /// EIP-1559 max fee per gas.
    pub max_fee_per_gas: U256,
    /// EIP-1559 max priority fee per gas.
    pub max_priority_fee_per_gas: U256,
}

/// Bundler-recommended fee tiers. The relay always uses [`Self::fast`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPriceTiers {
    /// Lowest tier, slowest inclusion.
    pub slow: GasFees,
    /// Middle tier.
    pub standard: GasFees,
    /// Highest tier, targeted inclusion in the next bundle.
    pub fast: GasFees,
}

/// Sponsorship fields returned by `pm_sponsorUserOperation`.
///
/// Once the paymaster sponsors, it is authoritative for the gas limits too:
/// applying a sponsorship overwrites whatever placeholders the draft carried.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sponsorship {
    /// The sponsoring paymaster contract.
    pub paymaster: Address,
    /// Opaque data the paymaster validates against.
    pub paymaster_data: Bytes,
    /// Gas limit for the paymaster validation phase.
    pub paymaster_verification_gas_limit: U256,
    /// Gas limit for the paymaster post-op phase.
    pub paymaster_post_op_gas_limit: U256,
    /// Estimated call gas limit.
    pub call_gas_limit: U256,
    /// Estimated verification gas limit.
    pub verification_gas_limit: U256,
    /// Estimated pre-verification gas.
    pub pre_verification_gas: U256,
}

impl Sponsorship {
    /// Merges the sponsorship into a draft operation, overwriting its gas
    /// placeholders.
    pub fn apply(self, op: &mut UserOperation) {
        op.call_gas_limit = self.call_gas_limit;
        op.verification_gas_limit = self.verification_gas_limit;
        op.pre_verification_gas = self.pre_verification_gas;
        op.paymaster = Some(self.paymaster);
        op.paymaster_data = Some(self.paymaster_data);
        op.paymaster_verification_gas_limit = Some(self.paymaster_verification_gas_limit);
        op.paymaster_post_op_gas_limit = Some(self.paymaster_post_op_gas_limit);
    }
}

/// Receipt for an included user operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    /// Whether the account's calls succeeded. `false` means the operation was
    /// included but reverted on-chain.
    pub success: bool,
    /// The enclosing transaction receipt.
    pub receipt: InclusionReceipt,
}

/// The part of the enclosing transaction receipt the relay consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionReceipt {
    /// Hash of the transaction that included the operation.
    pub transaction_hash: TxHash,
}

/// JSON-RPC client for one chain's bundler endpoint.
#[derive(Debug, Clone)]
pub struct BundlerClient {
    client: RpcClient,
    call_timeout: Duration,
}

impl BundlerClient {
    /// Creates a client for the given bundler URL.
    pub fn new(url: Url) -> Self {
        Self { client: ClientBuilder::default().http(url), call_timeout: RPC_CALL_TIMEOUT }
    }

    /// Sets the per-call bound. Defaults to [`RPC_CALL_TIMEOUT`].
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Bounds a single outbound call so a stalled endpoint fails the request
    /// instead of hanging the caller.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = T>,
    ) -> Result<T, RelayError> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .map_err(|_| RelayError::RpcTimeout(operation))
    }

    /// Fetches the bundler's recommended fee tiers.
    ///
    /// Failure is fatal for the current prepare call; there is no safe
    /// default fee to fall back to.
    pub async fn gas_price(&self) -> Result<GasPriceTiers, RelayError> {
        self.bounded(
            "bundler gas price query",
            self.client.request_noparams("pimlico_getUserOperationGasPrice"),
        )
        .await?
        .map_err(|err| RelayError::GasPriceUnavailable(rpc_reason(&err)))
    }

    /// Requests paymaster sponsorship for a draft operation.
    ///
    /// `sender`, `nonce` and `callData` must be final; gas fields may be
    /// placeholders. A JSON-RPC error object is a policy decision and is
    /// surfaced verbatim, never retried.
    pub async fn sponsor_user_operation(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<Sponsorship, RelayError> {
        self.bounded(
            "paymaster sponsorship call",
            self.client.request("pm_sponsorUserOperation", (op, entry_point)),
        )
        .await?
        .map_err(|err| match err {
            RpcError::ErrorResp(payload) => {
                RelayError::SponsorshipRejected(payload.message.to_string())
            }
            other => other.into(),
        })
    }

    /// Submits a signed operation to the bundler.
    ///
    /// Rejections (malformed op, invalid signature, simulation revert) are
    /// reported verbatim and never retried.
    pub async fn send_user_operation(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<B256, RelayError> {
        self.bounded(
            "user operation submission",
            self.client.request("eth_sendUserOperation", (op, entry_point)),
        )
        .await?
        .map_err(|err| match err {
            RpcError::ErrorResp(payload) => RelayError::BundlerRejected(payload.message.to_string()),
            other => other.into(),
        })
    }

    /// Fetches the receipt for an operation, if it has been included.
    pub async fn get_user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>, RelayError> {
        Ok(self
            .bounded(
                "bundler receipt query",
                self.client.request("eth_getUserOperationReceipt", (user_op_hash,)),
            )
            .await??)
    }

    /// Polls for the receipt on a fixed interval until it appears or
    /// `timeout` elapses.
    ///
    /// `Ok(None)` means the wait bound was hit, not that the operation
    /// failed: the poll retries absence of a result, while RPC errors
    /// propagate immediately. The loop holds no resources of its own, so
    /// dropping the future (e.g. when the caller's request is cancelled)
    /// stops the polling outright.
    pub async fn wait_for_receipt(
        &self,
        user_op_hash: B256,
        timeout: Duration,
    ) -> Result<Option<UserOperationReceipt>, RelayError> {
        let poll = async {
            let mut interval = tokio::time::interval(RECEIPT_POLL_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Some(receipt) = self.get_user_operation_receipt(user_op_hash).await? {
                    return Ok(receipt);
                }
                debug!(%user_op_hash, "user operation not yet included");
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(receipt) => receipt.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Like [`Self::wait_for_receipt`] with the default bound.
    pub async fn wait_for_receipt_default(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>, RelayError> {
        self.wait_for_receipt(user_op_hash, RECEIPT_TIMEOUT).await
    }
}

fn rpc_reason(err: &RpcError<TransportErrorKind>) -> String {
    match err {
        RpcError::ErrorResp(payload) => payload.message.to_string(),
        other => other.to_string(),
    }
}
