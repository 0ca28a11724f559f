//! Tron native-staking validator (spec.md §4.6).

use crate::chain::DecodedTx;
use crate::chain::tron::{ContractType, TronTransaction, addresses_match};
use crate::error::ValidatorError;
use crate::types::{OperationKind, TronResource, ValidationArgs, ValidationContext};

const SUPPORTED_OPS: [OperationKind; 11] = [
    OperationKind::Vote,
    OperationKind::FreezeBandwidth,
    OperationKind::FreezeEnergy,
    OperationKind::UnfreezeBandwidth,
    OperationKind::UnfreezeEnergy,
    OperationKind::UndelegateBandwidth,
    OperationKind::UndelegateEnergy,
    OperationKind::UnfreezeLegacyBandwidth,
    OperationKind::UnfreezeLegacyEnergy,
    OperationKind::Withdraw,
    OperationKind::ClaimRewards,
];

/// Validates vote/freeze/unfreeze/undelegate/withdraw transactions against Tron's resource contracts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TronStakeValidator;

impl TronStakeValidator {
    pub fn supported_ops(&self) -> &'static [OperationKind] {
        &SUPPORTED_OPS
    }

    pub fn validate(
        &self,
        tx: &DecodedTx,
        op: OperationKind,
        user_address: &str,
        args: &ValidationArgs,
        _ctx: &ValidationContext,
    ) -> Result<(), ValidatorError> {
        let tron = tx
            .as_tron()
            .ok_or_else(|| ValidatorError::new("expected a Tron transaction"))?;
        match op {
            OperationKind::Vote => validate_vote(tron, user_address, args),
            OperationKind::FreezeBandwidth => {
                validate_resource_op(tron, user_address, ContractType::FreezeBalanceV2Contract, TronResource::Bandwidth, "frozen_balance")
            }
            OperationKind::FreezeEnergy => {
                validate_resource_op(tron, user_address, ContractType::FreezeBalanceV2Contract, TronResource::Energy, "frozen_balance")
            }
            OperationKind::UnfreezeBandwidth => {
                validate_resource_op(tron, user_address, ContractType::UnfreezeBalanceV2Contract, TronResource::Bandwidth, "unfreeze_balance")
            }
            OperationKind::UnfreezeEnergy => {
                validate_resource_op(tron, user_address, ContractType::UnfreezeBalanceV2Contract, TronResource::Energy, "unfreeze_balance")
            }
            OperationKind::UndelegateBandwidth => {
                validate_resource_op(tron, user_address, ContractType::UnDelegateResourceContract, TronResource::Bandwidth, "balance")
            }
            OperationKind::UndelegateEnergy => {
                validate_resource_op(tron, user_address, ContractType::UnDelegateResourceContract, TronResource::Energy, "balance")
            }
            OperationKind::UnfreezeLegacyBandwidth => {
                validate_legacy_unfreeze(tron, user_address, TronResource::Bandwidth)
            }
            OperationKind::UnfreezeLegacyEnergy => {
                validate_legacy_unfreeze(tron, user_address, TronResource::Energy)
            }
            OperationKind::Withdraw => {
                validate_owner_only(tron, user_address, ContractType::WithdrawExpireUnfreezeContract)
            }
            OperationKind::ClaimRewards => {
                validate_owner_only(tron, user_address, ContractType::WithdrawBalanceContract)
            }
            _ => Err(ValidatorError::new("operation not supported by this validator")),
        }
    }
}

fn owner_matches(tron: &TronTransaction, user: &str) -> Result<(), ValidatorError> {
    let owner = tron
        .owner_address
        .as_deref()
        .ok_or_else(|| ValidatorError::new("transaction is missing owner_address"))?;
    if !addresses_match(owner, user) {
        return Err(ValidatorError::new("owner_address does not match user address"));
    }
    Ok(())
}

fn validate_vote(tron: &TronTransaction, user: &str, args: &ValidationArgs) -> Result<(), ValidatorError> {
    if tron.contract_type != ContractType::VoteWitnessContract {
        return Err(ValidatorError::new("contract type is not VoteWitnessContract"));
    }
    owner_matches(tron, user)?;
    if tron.votes.is_empty() || tron.votes.len() > 30 {
        return Err(ValidatorError::new("vote count must be between 1 and 30"));
    }
    let mut total = 0.0;
    for vote in &tron.votes {
        if bs58::decode(&vote.vote_address).into_vec().is_err() {
            return Err(ValidatorError::new("vote contains an invalid base58 address"));
        }
        if vote.vote_count.floor() <= 0.0 {
            return Err(ValidatorError::new("each vote must have a positive vote_count"));
        }
        total += vote.vote_count;
    }
    if total <= 0.0 {
        return Err(ValidatorError::new("sum of vote_count must be positive"));
    }
    let hinted: Option<Vec<&String>> = args
        .validator_addresses
        .as_ref()
        .map(|v| v.iter().collect())
        .or_else(|| args.validator_address.as_ref().map(|a| vec![a]));
    if let Some(hinted) = hinted {
        if hinted.len() != tron.votes.len() {
            return Err(ValidatorError::new("validator_addresses does not match the set of vote addresses"));
        }
        for addr in &hinted {
            if !tron.votes.iter().any(|v| addresses_match(&v.vote_address, addr)) {
                return Err(ValidatorError::new("validator_addresses does not match the set of vote addresses"));
            }
        }
    }
    Ok(())
}

fn resolve_resource(tron: &TronTransaction, expected: TronResource) -> Result<(), ValidatorError> {
    match tron.resource {
        Some(actual) if actual == expected => Ok(()),
        Some(_) => Err(ValidatorError::new("resource field does not match the requested operation")),
        None => Err(ValidatorError::new("resource field is not a recognized value")),
    }
}

fn validate_resource_op(
    tron: &TronTransaction,
    user: &str,
    contract_type: ContractType,
    resource: TronResource,
    field: &str,
) -> Result<(), ValidatorError> {
    if tron.contract_type != contract_type {
        return Err(ValidatorError::new(format!("contract type is not {contract_type:?}")));
    }
    owner_matches(tron, user)?;
    resolve_resource(tron, resource)?;
    let present = match field {
        "frozen_balance" => tron.frozen_balance.is_some(),
        "unfreeze_balance" => tron.unfreeze_balance.is_some(),
        "balance" => tron.balance.is_some(),
        _ => false,
    };
    if !present {
        return Err(ValidatorError::new(format!("transaction is missing {field}")));
    }
    Ok(())
}

fn validate_legacy_unfreeze(tron: &TronTransaction, user: &str, resource: TronResource) -> Result<(), ValidatorError> {
    if tron.contract_type != ContractType::UnfreezeBalanceContract {
        return Err(ValidatorError::new("contract type is not UnfreezeBalanceContract"));
    }
    owner_matches(tron, user)?;
    resolve_resource(tron, resource)?;
    Ok(())
}

fn validate_owner_only(tron: &TronTransaction, user: &str, contract_type: ContractType) -> Result<(), ValidatorError> {
    if tron.contract_type != contract_type {
        return Err(ValidatorError::new(format!("contract type is not {contract_type:?}")));
    }
    owner_matches(tron, user)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::tron;

    fn vote_tx(owner_hex: &str, vote_address: &str, vote_count: f64) -> TronTransaction {
        TronTransaction {
            contract_type: ContractType::VoteWitnessContract,
            owner_address: Some(owner_hex.to_string()),
            votes: vec![tron::Vote {
                vote_address: vote_address.to_string(),
                vote_count,
            }],
            resource: Some(TronResource::Bandwidth),
            frozen_balance: None,
            unfreeze_balance: None,
            balance: None,
            raw_value: serde_json::Value::Null,
        }
    }

    #[test]
    fn vote_with_wrong_owner_is_blocked() {
        let owner_hex = "41aabbccddeeff00112233445566778899aabbccdd";
        let owner_base58 = tron::hex_to_base58(owner_hex).unwrap();
        let other_user = "41112233445566778899aabbccddeeff001122334";
        let tx = vote_tx(owner_hex, "41112233445566778899aabbccddeeff001122334", 5.0);
        let other_base58 = tron::hex_to_base58(other_user).unwrap();
        assert_ne!(owner_base58, other_base58);
        let err = validate_vote(&tx, &other_base58, &ValidationArgs::default()).unwrap_err();
        assert!(err.reason.contains("does not match user address"));
    }

    #[test]
    fn freeze_defaults_to_bandwidth_and_requires_owner() {
        let owner_hex = "41aabbccddeeff00112233445566778899aabbccdd";
        let owner_base58 = tron::hex_to_base58(owner_hex).unwrap();
        let tx = TronTransaction {
            contract_type: ContractType::FreezeBalanceV2Contract,
            owner_address: Some(owner_hex.to_string()),
            votes: vec![],
            resource: Some(TronResource::Bandwidth),
            frozen_balance: Some(serde_json::json!(1_000_000)),
            unfreeze_balance: None,
            balance: None,
            raw_value: serde_json::Value::Null,
        };
        let result = validate_resource_op(
            &tx,
            &owner_base58,
            ContractType::FreezeBalanceV2Contract,
            TronResource::Bandwidth,
            "frozen_balance",
        );
        assert!(result.is_ok());
    }
}
