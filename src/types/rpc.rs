//! Request and response types for the HTTP surface.

use super::{Call, UserOperation};
use alloy::primitives::{Address, B256, ChainId, TxHash, private::derive_more, wrap_fixed_bytes};
use serde::{Deserialize, Serialize};

wrap_fixed_bytes! {
    /// Identifier of an operation awaiting the user's signature.
    ///
    /// Generated from a CSPRNG; clients should treat it as an opaque value.
    pub struct OpId<32>;
}

/// Response for `GET /gasless/check/{address}/{chain_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    /// Whether the account can go through the gasless flow.
    pub enabled: bool,
    /// The delegation target when the account is delegated.
    pub delegator: Option<Address>,
    /// Human readable chain name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    /// Reason the check could not be performed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request body for `POST /gasless/prepare`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareParameters {
    /// The delegated account executing the calls.
    pub address: Address,
    /// Target chain ID. A plain number, unlike the hex quantities on the
    /// bundler wire.
    pub chain_id: ChainId,
    /// Call bundle to execute.
    pub calls: Vec<Call>,
}

/// Response body for `POST /gasless/prepare`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareResponse {
    /// Always `true`; failures return an error body instead.
    pub success: bool,
    /// Handle to pass back into `/gasless/submit`.
    pub op_id: OpId,
    /// The sponsored operation the user is signing.
    pub user_op: UserOperation,
    /// The digest to sign.
    pub user_op_hash: B256,
    /// Target chain ID, echoed back.
    pub chain_id: ChainId,
    /// Human readable instruction for the wallet UI.
    pub message: String,
}

/// Request body for `POST /gasless/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitParameters {
    /// The operation handle returned by `/gasless/prepare`.
    pub op_id: OpId,
    /// The raw 65-byte ECDSA signature over the user operation hash.
    pub signature: alloy::primitives::Bytes,
}

/// Response body for `POST /gasless/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// Whether the operation made it on-chain without reverting. Also `true`
    /// for the pending outcome, where inclusion is simply not confirmed yet.
    pub success: bool,
    /// Set when the bundler accepted the operation but no receipt appeared
    /// within the wait bound. The caller should poll the explorer instead of
    /// treating this as a failure.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
    /// The operation hash the bundler tracks the submission under.
    pub user_op_hash: B256,
    /// The including transaction, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// Explorer link for `tx_hash`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Marker that no native gas left the user's account.
    pub gasless: bool,
    /// Human readable outcome description.
    pub message: String,
}

impl SubmitResponse {
    /// The operation was included and its calls succeeded.
    pub fn confirmed(user_op_hash: B256, tx_hash: TxHash, explorer_url: String) -> Self {
        Self {
            success: true,
            pending: false,
            user_op_hash,
            tx_hash: Some(tx_hash),
            explorer_url: Some(explorer_url),
            gasless: true,
            message: "Gasless transaction confirmed".into(),
        }
    }

    /// The operation was included but the underlying calls reverted.
    pub fn reverted(user_op_hash: B256, tx_hash: TxHash, explorer_url: String) -> Self {
        Self {
            success: false,
            pending: false,
            user_op_hash,
            tx_hash: Some(tx_hash),
            explorer_url: Some(explorer_url),
            gasless: true,
            message: "Transaction failed on-chain".into(),
        }
    }

    /// The bundler accepted the operation but no receipt appeared within the
    /// wait bound.
    pub fn pending(user_op_hash: B256) -> Self {
        Self {
            success: true,
            pending: true,
            user_op_hash,
            tx_hash: None,
            explorer_url: None,
            gasless: true,
            message: "Submitted, awaiting confirmation; check the explorer for the receipt".into(),
        }
    }
}
