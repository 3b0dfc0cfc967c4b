//! ERC-4337 v0.7 user operation type, wire encoding and canonical hashing.

use alloy::{
    primitives::{Address, B256, Bytes, ChainId, KECCAK256_EMPTY, U256, keccak256},
    sol,
    sol_types::SolValue,
};
use serde::{Deserialize, Serialize};

sol! {
    /// The v0.7 EntryPoint surface the relay needs: per-sender nonces, keyed
    /// by a 192-bit sequence key. The relay always uses key zero.
    #[sol(rpc)]
    contract IEntryPoint {
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
    }
}

/// Errors produced while packing user operation fields.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// A gas or fee field does not fit into the 128-bit half of a packed word.
    ///
    /// Packing must fail loudly here; truncating would produce a hash the
    /// bundler disagrees with and every submission would fail signature
    /// verification.
    #[error("{field} does not fit in 128 bits: {value}")]
    FieldOverflow {
        /// Name of the offending field.
        field: &'static str,
        /// The oversized value.
        value: U256,
    },
}

/// An unpacked ERC-4337 v0.7 user operation.
///
/// This is the wire shape bundlers and paymasters speak: every numeric field
/// serializes as a `0x`-prefixed hex quantity, and the paymaster block is
/// omitted entirely until a sponsor is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// The delegated account the operation executes as.
    pub sender: Address,
    /// The EntryPoint nonce for `sender`, key zero.
    pub nonce: U256,
    /// Calls encoded into the account's execute format.
    pub call_data: Bytes,
    /// Gas limit for the execution phase.
    pub call_gas_limit: U256,
    /// Gas limit for the validation phase.
    pub verification_gas_limit: U256,
    /// Gas the bundler is compensated for outside of execution.
    pub pre_verification_gas: U256,
    /// EIP-1559 max fee per gas.
    pub max_fee_per_gas: U256,
    /// EIP-1559 max priority fee per gas.
    pub max_priority_fee_per_gas: U256,
    /// The sponsoring paymaster, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    /// Gas limit for the paymaster validation phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    /// Gas limit for the paymaster post-op phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    /// Opaque data forwarded to the paymaster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    /// The account signature over [`UserOperation::compute_hash`].
    ///
    /// A fixed dummy value until the user has signed.
    #[serde(default, skip_serializing_if = "<[u8]>::is_empty")]
    pub signature: Bytes,
}

impl UserOperation {
    /// Packs `accountGasLimits`: `verificationGasLimit (16B) || callGasLimit (16B)`,
    /// both big-endian.
    pub fn pack_gas_limits(
        verification_gas_limit: U256,
        call_gas_limit: U256,
    ) -> Result<B256, CodecError> {
        pack_u128_pair(
            ("verificationGasLimit", verification_gas_limit),
            ("callGasLimit", call_gas_limit),
        )
    }

    /// Packs `gasFees`: `maxPriorityFeePerGas (16B) || maxFeePerGas (16B)`,
    /// both big-endian.
    pub fn pack_gas_fees(
        max_priority_fee_per_gas: U256,
        max_fee_per_gas: U256,
    ) -> Result<B256, CodecError> {
        pack_u128_pair(
            ("maxPriorityFeePerGas", max_priority_fee_per_gas),
            ("maxFeePerGas", max_fee_per_gas),
        )
    }

    /// Packs `paymasterAndData`:
    /// `paymaster (20B) || paymasterVerificationGasLimit (16B) || paymasterPostOpGasLimit (16B) || paymasterData`.
    ///
    /// Returns empty bytes when no paymaster is set.
    pub fn pack_paymaster_and_data(&self) -> Result<Bytes, CodecError> {
        let Some(paymaster) = self.paymaster else {
            return Ok(Bytes::new());
        };

        let verification_limit = into_u128(
            "paymasterVerificationGasLimit",
            self.paymaster_verification_gas_limit.unwrap_or_default(),
        )?;
        let post_op_limit = into_u128(
            "paymasterPostOpGasLimit",
            self.paymaster_post_op_gas_limit.unwrap_or_default(),
        )?;
        let data = self.paymaster_data.as_deref().map(|b| &b[..]).unwrap_or_default();

        let mut out = Vec::with_capacity(20 + 16 + 16 + data.len());
        out.extend_from_slice(paymaster.as_slice());
        out.extend_from_slice(&verification_limit.to_be_bytes());
        out.extend_from_slice(&post_op_limit.to_be_bytes());
        out.extend_from_slice(data);
        Ok(out.into())
    }

    /// Computes the canonical v0.7 user operation hash: the digest the user
    /// signs and the id the bundler tracks the operation under.
    ///
    /// `keccak256(abi.encode(keccak256(abi.encode(sender, nonce, keccak256(initCode),
    /// keccak256(callData), accountGasLimits, preVerificationGas, gasFees,
    /// keccak256(paymasterAndData))), entryPoint, chainId))`, with an always
    /// empty `initCode` since delegated accounts never deploy.
    pub fn compute_hash(
        &self,
        entry_point: Address,
        chain_id: ChainId,
    ) -> Result<B256, CodecError> {
        let packed = (
            self.sender,
            self.nonce,
            KECCAK256_EMPTY,
            keccak256(&self.call_data),
            Self::pack_gas_limits(self.verification_gas_limit, self.call_gas_limit)?,
            self.pre_verification_gas,
            Self::pack_gas_fees(self.max_priority_fee_per_gas, self.max_fee_per_gas)?,
            keccak256(self.pack_paymaster_and_data()?),
        )
            .abi_encode();

        Ok(keccak256((keccak256(packed), entry_point, U256::from(chain_id)).abi_encode()))
    }
}

/// Splits a packed 32-byte word back into its two big-endian 128-bit halves.
pub fn unpack_u128_pair(word: B256) -> (U256, U256) {
    let bytes = word.as_slice();
    (
        U256::from_be_slice(&bytes[..16]),
        U256::from_be_slice(&bytes[16..]),
    )
}

fn pack_u128_pair(
    high: (&'static str, U256),
    low: (&'static str, U256),
) -> Result<B256, CodecError> {
    let high = into_u128(high.0, high.1)?;
    let low = into_u128(low.0, low.1)?;

    let mut word = [0u8; 32];
    word[..16].copy_from_slice(&high.to_be_bytes());
    word[16..].copy_from_slice(&low.to_be_bytes());
    Ok(word.into())
}

fn into_u128(field: &'static str, value: U256) -> Result<u128, CodecError> {
    value.try_into().map_err(|_| CodecError::FieldOverflow { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DUMMY_SIGNATURE, ENTRYPOINT_V07};
    use alloy::primitives::{address, bytes, uint};

    fn sponsored_op() -> UserOperation {
        UserOperation {
            sender: address!("0x36963a67df1bdce1ab0d9e3a84896b56dc507a36"),
            nonce: U256::from(5),
            call_data: bytes!("0xe9ae5c5301000000"),
            call_gas_limit: U256::from(80_000),
            verification_gas_limit: U256::from(120_000),
            pre_verification_gas: U256::from(51_000),
            max_fee_per_gas: U256::from(30_000_000_000u64),
            max_priority_fee_per_gas: U256::from(1_500_000_000u64),
            paymaster: Some(address!("0x7702000000000000000000000000000000000777")),
            paymaster_verification_gas_limit: Some(U256::from(40_000)),
            paymaster_post_op_gas_limit: Some(U256::from(10_000)),
            paymaster_data: Some(bytes!("0xdeadbeef")),
            signature: DUMMY_SIGNATURE.clone(),
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let op = sponsored_op();
        let first = op.compute_hash(ENTRYPOINT_V07, 11155111).unwrap();
        let second = op.compute_hash(ENTRYPOINT_V07, 11155111).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn hash_changes_with_any_field() {
        let base = sponsored_op();
        let base_hash = base.compute_hash(ENTRYPOINT_V07, 11155111).unwrap();

        let mut bumped_fee = base.clone();
        bumped_fee.max_fee_per_gas += U256::from(1);
        assert_ne!(bumped_fee.compute_hash(ENTRYPOINT_V07, 11155111).unwrap(), base_hash);

        let mut bumped_nonce = base.clone();
        bumped_nonce.nonce = U256::from(6);
        assert_ne!(bumped_nonce.compute_hash(ENTRYPOINT_V07, 11155111).unwrap(), base_hash);

        // Different chain, same fields.
        assert_ne!(base.compute_hash(ENTRYPOINT_V07, 80002).unwrap(), base_hash);
    }

    #[test]
    fn signature_does_not_affect_hash() {
        let mut op = sponsored_op();
        let hash = op.compute_hash(ENTRYPOINT_V07, 11155111).unwrap();
        op.signature = bytes!("0x1234");
        assert_eq!(op.compute_hash(ENTRYPOINT_V07, 11155111).unwrap(), hash);
    }

    #[test]
    fn packing_round_trips_at_boundaries() {
        for (a, b) in [
            (U256::ZERO, U256::ZERO),
            (U256::from(1), U256::ZERO),
            (U256::ZERO, U256::from(1)),
            (U256::from(u128::MAX), U256::from(u128::MAX)),
            (U256::from(120_000), U256::from(80_000)),
        ] {
            let limits = UserOperation::pack_gas_limits(a, b).unwrap();
            assert_eq!(unpack_u128_pair(limits), (a, b));

            let fees = UserOperation::pack_gas_fees(a, b).unwrap();
            assert_eq!(unpack_u128_pair(fees), (a, b));
        }
    }

    #[test]
    fn oversized_field_is_rejected() {
        let too_big = U256::from(u128::MAX) + U256::from(1);
        let err = UserOperation::pack_gas_limits(too_big, U256::ZERO).unwrap_err();
        assert_eq!(
            err,
            CodecError::FieldOverflow { field: "verificationGasLimit", value: too_big }
        );

        let mut op = sponsored_op();
        op.paymaster_post_op_gas_limit = Some(too_big);
        assert!(op.pack_paymaster_and_data().is_err());
        assert!(op.compute_hash(ENTRYPOINT_V07, 1).is_err());
    }

    #[test]
    fn paymaster_and_data_layout() {
        let op = sponsored_op();
        let packed = op.pack_paymaster_and_data().unwrap();

        assert_eq!(packed.len(), 20 + 16 + 16 + 4);
        assert_eq!(&packed[..20], op.paymaster.unwrap().as_slice());
        assert_eq!(
            U256::from_be_slice(&packed[20..36]),
            op.paymaster_verification_gas_limit.unwrap()
        );
        assert_eq!(U256::from_be_slice(&packed[36..52]), op.paymaster_post_op_gas_limit.unwrap());
        assert_eq!(&packed[52..], &bytes!("0xdeadbeef")[..]);
    }

    #[test]
    fn no_paymaster_packs_empty() {
        let op = UserOperation { paymaster: None, ..sponsored_op() };
        assert_eq!(op.pack_paymaster_and_data().unwrap(), Bytes::new());
    }

    #[test]
    fn wire_format_is_camel_case_hex() {
        let op = sponsored_op();
        let json = serde_json::to_value(&op).unwrap();

        assert_eq!(json["sender"], "0x36963a67df1bdce1ab0d9e3a84896b56dc507a36");
        assert_eq!(json["nonce"], "0x5");
        assert_eq!(json["callGasLimit"], "0x13880");
        assert_eq!(json["maxPriorityFeePerGas"], "0x59682f00");
        assert_eq!(json["paymasterData"], "0xdeadbeef");

        let back: UserOperation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn unsponsored_wire_format_omits_paymaster_block() {
        let op = UserOperation {
            paymaster: None,
            paymaster_verification_gas_limit: None,
            paymaster_post_op_gas_limit: None,
            paymaster_data: None,
            ..sponsored_op()
        };
        let json = serde_json::to_value(&op).unwrap();
        assert!(json.get("paymaster").is_none());
        assert!(json.get("paymasterData").is_none());
    }

    #[test]
    fn known_nonce_values_diverge() {
        let five = sponsored_op();
        let six = UserOperation { nonce: uint!(6_U256), ..sponsored_op() };
        assert_ne!(
            five.compute_hash(ENTRYPOINT_V07, 80002).unwrap(),
            six.compute_hash(ENTRYPOINT_V07, 80002).unwrap(),
        );
    }
}
