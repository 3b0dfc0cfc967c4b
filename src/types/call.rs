//! Caller-supplied call tuples and their ERC-7579 execute encoding.

use alloy::{
    primitives::{Address, B256, Bytes, U256, b256},
    sol,
    sol_types::{SolCall, SolValue},
};
use serde::{Deserialize, Serialize};

sol! {
    /// ERC-7579 execution struct, the element type of a batch
    /// `executionCalldata`.
    struct Execution {
        address target;
        uint256 value;
        bytes callData;
    }

    /// ERC-7579 execute entrypoint exposed by delegated accounts.
    function execute(bytes32 mode, bytes executionCalldata);
}

/// ERC-7579 mode for a single packed call.
const MODE_SINGLE: B256 = B256::ZERO;

/// ERC-7579 mode for a batch of ABI-encoded executions.
const MODE_BATCH: B256 =
    b256!("0x0100000000000000000000000000000000000000000000000000000000000000");

/// A single call requested by the user. Opaque to the relay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    /// The call target.
    pub to: Address,
    /// Native value forwarded with the call.
    #[serde(default)]
    pub value: U256,
    /// The calldata bytes.
    #[serde(default)]
    pub data: Bytes,
}

/// Encodes `calls` into the delegated account's `execute(bytes32,bytes)`
/// calldata.
///
/// A single call uses the packed single-call mode, anything else the batch
/// mode with an ABI-encoded `Execution[]`.
pub fn encode_execute(calls: &[Call]) -> Bytes {
    let (mode, execution_calldata): (B256, Bytes) = if let [call] = calls {
        let mut packed = Vec::with_capacity(20 + 32 + call.data.len());
        packed.extend_from_slice(call.to.as_slice());
        packed.extend_from_slice(&call.value.to_be_bytes::<32>());
        packed.extend_from_slice(&call.data);
        (MODE_SINGLE, packed.into())
    } else {
        let executions: Vec<Execution> = calls
            .iter()
            .map(|call| Execution {
                target: call.to,
                value: call.value,
                callData: call.data.clone(),
            })
            .collect();
        (MODE_BATCH, executions.abi_encode().into())
    };

    executeCall { mode, executionCalldata: execution_calldata }.abi_encode().into()
}
