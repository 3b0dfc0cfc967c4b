//! Relay constants.

use alloy::primitives::{Address, Bytes, address, bytes};
use std::time::Duration;

/// The canonical ERC-4337 v0.7 EntryPoint address.
pub const ENTRYPOINT_V07: Address = address!("0x0000000071727De22E5E9d8BAf0edAc6f37da032");

/// Dummy 65-byte ECDSA signature attached to draft user operations.
///
/// Paymasters and bundlers simulate validation against a signature of realistic
/// length before the user has signed anything; the value itself never verifies.
pub static DUMMY_SIGNATURE: Bytes = bytes!(
    "0xfffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c"
);

/// How long a prepared operation waits for the user's signature before it is
/// evicted from storage.
pub const PENDING_OP_TTL: Duration = Duration::from_secs(5 * 60);

/// Upper bound on any single outbound RPC call (chain provider or bundler).
/// A stalled upstream fails the call instead of hanging the handler.
pub const RPC_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Interval between `eth_getUserOperationReceipt` polls.
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Upper bound on the receipt wait after submission. Past this the operation is
/// reported as pending rather than confirmed.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Placeholder call gas limit for draft operations, overwritten by the
/// paymaster once it sponsors.
pub const DRAFT_CALL_GAS_LIMIT: u64 = 500_000;

/// Placeholder verification gas limit for draft operations.
pub const DRAFT_VERIFICATION_GAS_LIMIT: u64 = 500_000;

/// Placeholder pre-verification gas for draft operations.
pub const DRAFT_PRE_VERIFICATION_GAS: u64 = 100_000;
