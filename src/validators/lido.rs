//! Lido stETH staking validator (spec.md §4.3).

use alloy_primitives::{Address, U256, address};
use alloy_sol_types::SolCall;

use crate::chain::DecodedTx;
use crate::chain::evm::{EvmTransaction, address_matches, decode_call};
use crate::error::ValidatorError;
use crate::types::{OperationKind, ValidationArgs, ValidationContext};

const STETH_ADDRESS: &str = "0xae7ab96520de3a18e5e111b5eaab095312d7fe84";
const WITHDRAWAL_QUEUE_ADDRESS: &str = "0x889edc2edab5f40e902b864ad4d7ade8e412f9b1";
const REFERRAL_ADDRESS: Address = address!("371240e80bf84ec2ba8b55ae2fd0b467b16db2be");
const LIDO_CHAIN_ID: u64 = 1;

const SUPPORTED_OPS: [OperationKind; 3] = [
    OperationKind::Stake,
    OperationKind::Unstake,
    OperationKind::ClaimUnstaked,
];

alloy_sol_types::sol! {
    function submit(address referral) external payable returns (uint256);
    function requestWithdrawals(uint256[] amounts, address owner) external returns (uint256[] requestIds);
    function claimWithdrawal(uint256 requestId) external;
    function claimWithdrawals(uint256[] requestIds, uint256[] hints) external;
}

/// Validates stake/unstake/claim transactions against Lido's stETH and Withdrawal Queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct LidoValidator;

impl LidoValidator {
    pub fn supported_ops(&self) -> &'static [OperationKind] {
        &SUPPORTED_OPS
    }

    pub fn validate(
        &self,
        tx: &DecodedTx,
        op: OperationKind,
        user_address: &str,
        _args: &ValidationArgs,
        _ctx: &ValidationContext,
    ) -> Result<(), ValidatorError> {
        let evm = tx
            .as_evm()
            .ok_or_else(|| ValidatorError::new("expected an EVM transaction"))?;
        if evm.chain_id != LIDO_CHAIN_ID {
            return Err(ValidatorError::new("unsupported chain id for Lido staking"));
        }
        if !evm.from_matches(user_address) {
            return Err(ValidatorError::new(
                "transaction sender does not match user address",
            ));
        }
        match op {
            OperationKind::Stake => self.validate_stake(evm),
            OperationKind::Unstake => self.validate_unstake(evm, user_address),
            OperationKind::ClaimUnstaked => self.validate_claim_unstaked(evm),
            _ => Err(ValidatorError::new("operation not supported by this validator")),
        }
    }

    fn validate_stake(&self, evm: &EvmTransaction) -> Result<(), ValidatorError> {
        if !evm.to_matches(STETH_ADDRESS) {
            return Err(ValidatorError::new(
                "transaction recipient is not the Lido stETH contract",
            ));
        }
        let call = decode_call::<submitCall>(&evm.data)?;
        if call.referral != REFERRAL_ADDRESS {
            return Err(ValidatorError::new(
                "referral address does not match the required Lido referral",
            ));
        }
        Ok(())
    }

    fn validate_unstake(&self, evm: &EvmTransaction, user: &str) -> Result<(), ValidatorError> {
        if !evm.to_matches(WITHDRAWAL_QUEUE_ADDRESS) {
            return Err(ValidatorError::new(
                "transaction recipient is not the Lido Withdrawal Queue",
            ));
        }
        if evm.value != U256::ZERO {
            return Err(ValidatorError::new(
                "unstake transactions must not carry ETH value",
            ));
        }
        let call = decode_call::<requestWithdrawalsCall>(&evm.data)?;
        if call.amounts.is_empty() {
            return Err(ValidatorError::new("requestWithdrawals amounts must be non-empty"));
        }
        if !address_matches(call.owner, user) {
            return Err(ValidatorError::new(
                "requestWithdrawals owner does not match user address",
            ));
        }
        Ok(())
    }

    fn validate_claim_unstaked(&self, evm: &EvmTransaction) -> Result<(), ValidatorError> {
        if !evm.to_matches(WITHDRAWAL_QUEUE_ADDRESS) {
            return Err(ValidatorError::new(
                "transaction recipient is not the Lido Withdrawal Queue",
            ));
        }
        if evm.value != U256::ZERO {
            return Err(ValidatorError::new(
                "claim transactions must not carry ETH value",
            ));
        }
        let selector: Option<[u8; 4]> = evm.data.get(0..4).and_then(|s| s.try_into().ok());
        if selector == Some(claimWithdrawalCall::SELECTOR) {
            decode_call::<claimWithdrawalCall>(&evm.data)?;
            return Ok(());
        }
        if selector == Some(claimWithdrawalsCall::SELECTOR) {
            let call = decode_call::<claimWithdrawalsCall>(&evm.data)?;
            if call.requestIds.is_empty() {
                return Err(ValidatorError::new("claimWithdrawals ids must be non-empty"));
            }
            if call.requestIds.len() != call.hints.len() {
                return Err(ValidatorError::new(
                    "claimWithdrawals ids and hints length mismatch",
                ));
            }
            return Ok(());
        }
        Err(ValidatorError::new(
            "calldata does not match a known Lido claim method",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::evm;

    fn stake_tx(referral: Address, extra_bytes: &[u8]) -> String {
        let call = submitCall { referral };
        let mut data = call.abi_encode();
        data.extend_from_slice(extra_bytes);
        serde_json::json!({
            "to": STETH_ADDRESS,
            "from": "0x742d35cc6634c0532925a3b844bc9e7595f0beb8",
            "value": "0xde0b6b3a7640000",
            "data": format!("0x{}", hex::encode(data)),
            "chainId": 1,
        })
        .to_string()
    }

    #[test]
    fn stake_happy_path_matches() {
        let raw = stake_tx(REFERRAL_ADDRESS, &[]);
        let tx = evm::decode(&raw).unwrap();
        let decoded = DecodedTx::Evm(tx);
        let result = LidoValidator.validate(
            &decoded,
            OperationKind::Stake,
            "0x742d35cc6634c0532925a3b844bc9e7595f0beb8",
            &ValidationArgs::default(),
            &ValidationContext::default(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn tampered_stake_is_blocked() {
        let raw = stake_tx(REFERRAL_ADDRESS, b"\xde\xad\xbe\xef");
        let tx = evm::decode(&raw).unwrap();
        let decoded = DecodedTx::Evm(tx);
        let err = LidoValidator
            .validate(
                &decoded,
                OperationKind::Stake,
                "0x742d35cc6634c0532925a3b844bc9e7595f0beb8",
                &ValidationArgs::default(),
                &ValidationContext::default(),
            )
            .unwrap_err();
        assert!(err.reason.contains("tampered"));
    }

    #[test]
    fn wrong_chain_is_blocked() {
        let raw = serde_json::json!({
            "to": STETH_ADDRESS,
            "from": "0x742d35cc6634c0532925a3b844bc9e7595f0beb8",
            "chainId": 5,
            "data": "0x",
        })
        .to_string();
        let tx = evm::decode(&raw).unwrap();
        let decoded = DecodedTx::Evm(tx);
        let err = LidoValidator
            .validate(
                &decoded,
                OperationKind::Stake,
                "0x742d35cc6634c0532925a3b844bc9e7595f0beb8",
                &ValidationArgs::default(),
                &ValidationContext::default(),
            )
            .unwrap_err();
        assert!(err.reason.contains("chain id"));
    }
}
