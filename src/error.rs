//! Relay error types.

use crate::types::CodecError;
use alloy::{
    primitives::{Address, ChainId},
    transports::{RpcError, TransportErrorKind},
};
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};

/// The overarching error type returned by the relay surface.
///
/// Every transport failure is translated into one of these at the component
/// boundary; raw RPC errors never cross into response bodies unclassified.
/// None of the variants is retried internally: paymaster and bundler
/// rejections reflect policy or validation decisions.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The chain is not in the registry.
    #[error("unsupported chain {0}")]
    UnsupportedChain(ChainId),
    /// The account is not set up for the chain's gasless method: no EIP-7702
    /// delegation designator (or no account code at all) at the address.
    #[error("smart account not enabled for {0}")]
    DelegationMissing(Address),
    /// The bundler could not produce fee tiers. Fatal for the current prepare
    /// call, as no safe default fee exists.
    #[error("bundler gas price unavailable: {0}")]
    GasPriceUnavailable(String),
    /// The paymaster declined to sponsor the operation.
    #[error("paymaster rejected sponsorship: {0}")]
    SponsorshipRejected(String),
    /// The operation id was never issued, already consumed, or past its TTL.
    #[error("operation not found or expired")]
    OperationExpiredOrUnknown,
    /// The bundler rejected the signed operation at submission.
    #[error("bundler rejected user operation: {0}")]
    BundlerRejected(String),
    /// An outbound RPC call exceeded the per-call bound.
    #[error("{0} timed out")]
    RpcTimeout(&'static str),
    /// A user operation field could not be packed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// An error occurred talking to the chain RPC.
    #[error(transparent)]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// An error occurred in a contract view call.
    #[error(transparent)]
    Contract(#[from] alloy::contract::Error),
    /// An internal error occurred.
    #[error(transparent)]
    Internal(#[from] eyre::Error),
}

impl RelayError {
    /// HTTP status for this error: caller and upstream-policy errors map to
    /// 400, everything else is internal.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedChain(_)
            | Self::DelegationMissing(_)
            | Self::SponsorshipRejected(_)
            | Self::OperationExpiredOrUnknown
            | Self::BundlerRejected(_) => StatusCode::BAD_REQUEST,
            Self::GasPriceUnavailable(_)
            | Self::RpcTimeout(_)
            | Self::Codec(_)
            | Self::Rpc(_)
            | Self::Contract(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Structured reason string.
    pub error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_are_bad_request() {
        assert_eq!(RelayError::UnsupportedChain(1).status(), StatusCode::BAD_REQUEST);
        assert_eq!(RelayError::OperationExpiredOrUnknown.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::BundlerRejected("AA24 signature error".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::GasPriceUnavailable("connection refused".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RelayError::RpcTimeout("bundler gas price query").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
