//! Solana native-staking validator (spec.md §4.5).
//!
//! Every op requires an *exact* positional instruction sequence; nothing
//! is inferred from account metadata alone. Stake-account authorization
//! (staker/withdrawer) is parsed directly out of `Initialize`'s instruction
//! data, mirroring how the teacher's Solana facilitator reads the stake
//! program's account layout instead of trusting caller-supplied hints.

use crate::chain::DecodedTx;
use crate::chain::solana::{Discriminator, SolanaInstruction, SolanaTransaction};
use crate::error::ValidatorError;
use crate::types::{OperationKind, ValidationArgs, ValidationContext};

const SUPPORTED_OPS: [OperationKind; 5] = [
    OperationKind::Stake,
    OperationKind::Unstake,
    OperationKind::Withdraw,
    OperationKind::WithdrawAll,
    OperationKind::Split,
];

/// Validates staking/unstaking/withdrawal/split transactions against the native stake program.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolanaStakeValidator;

impl SolanaStakeValidator {
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
        let solana = tx
            .as_solana()
            .ok_or_else(|| ValidatorError::new("expected a Solana transaction"))?;
        match op {
            OperationKind::Stake => validate_stake(solana, user_address, args),
            OperationKind::Unstake => validate_unstake(solana, user_address),
            OperationKind::Withdraw => validate_withdraw(solana, user_address, false),
            OperationKind::WithdrawAll => validate_withdraw(solana, user_address, true),
            OperationKind::Split => validate_split(solana, user_address),
            _ => Err(ValidatorError::new("operation not supported by this validator")),
        }
    }
}

fn account_pubkey(ix: &SolanaInstruction, index: usize) -> Result<&str, ValidatorError> {
    ix.account(index)
        .map(|a| a.pubkey.as_str())
        .ok_or_else(|| ValidatorError::new(format!("instruction is missing account at index {index}")))
}

fn require_no_extra_budget_prefix(instructions: &[SolanaInstruction]) -> Result<(), ValidatorError> {
    if instructions.len() < 2
        || instructions[0].discriminator != Discriminator::ComputeBudgetSetComputeUnitLimit
        || instructions[1].discriminator != Discriminator::ComputeBudgetSetComputeUnitPrice
    {
        return Err(ValidatorError::new(
            "expected compute-budget instructions at the start of the transaction",
        ));
    }
    Ok(())
}

/// Parses the authorized staker/withdrawer pubkeys out of a `StakeInitialize` instruction's data.
///
/// Matches the on-chain layout: a `StakeAuthorize` struct of two 32-byte
/// pubkeys (staker, then withdrawer) follows the 4-byte instruction tag.
fn parse_initialize_authorities(data: &[u8]) -> Result<(String, String), ValidatorError> {
    if data.len() < 4 + 32 + 32 {
        return Err(ValidatorError::new("Initialize instruction data too short"));
    }
    let staker = bs58::encode(&data[4..36]).into_string();
    let withdrawer = bs58::encode(&data[36..68]).into_string();
    Ok((staker, withdrawer))
}

fn validate_stake(
    tx: &SolanaTransaction,
    user: &str,
    args: &ValidationArgs,
) -> Result<(), ValidatorError> {
    if tx.instructions.len() != 5 {
        return Err(ValidatorError::new("expected exactly 5 instructions for STAKE"));
    }
    require_no_extra_budget_prefix(&tx.instructions)?;
    let create = &tx.instructions[2];
    let initialize = &tx.instructions[3];
    let delegate = &tx.instructions[4];
    if create.discriminator != Discriminator::SystemCreateAccountWithSeed {
        return Err(ValidatorError::new("expected CreateAccountWithSeed at position 3"));
    }
    if initialize.discriminator != Discriminator::StakeInitialize {
        return Err(ValidatorError::new("expected Stake Initialize at position 4"));
    }
    if delegate.discriminator != Discriminator::StakeDelegate {
        return Err(ValidatorError::new("expected Stake Delegate at position 5"));
    }

    let create_source = account_pubkey(create, 0)?;
    if create_source != user {
        return Err(ValidatorError::new(
            "CreateAccountWithSeed source does not match user address",
        ));
    }
    let created_account = account_pubkey(create, 1)?.to_string();

    let init_stake_account = account_pubkey(initialize, 0)?;
    if init_stake_account != created_account {
        return Err(ValidatorError::new(
            "Initialize stake account does not match the created account",
        ));
    }
    let (staker, withdrawer) = parse_initialize_authorities(&initialize.data)?;
    if staker != user || withdrawer != user {
        return Err(ValidatorError::new(
            "Initialize does not authorize both staker and withdrawer to the user",
        ));
    }

    let delegate_stake_account = account_pubkey(delegate, 0)?;
    if delegate_stake_account != created_account {
        return Err(ValidatorError::new(
            "Delegate stake account does not match the created account",
        ));
    }
    let delegate_authority = account_pubkey(delegate, 5)?;
    if delegate_authority != user {
        return Err(ValidatorError::new("Delegate authority does not match user address"));
    }
    if let Some(validator_address) = &args.validator_address {
        let vote_account = account_pubkey(delegate, 1)?;
        if vote_account != validator_address {
            return Err(ValidatorError::new("Delegate vote account does not match validator_address"));
        }
    }
    Ok(())
}

fn validate_unstake(tx: &SolanaTransaction, user: &str) -> Result<(), ValidatorError> {
    if tx.instructions.len() < 3 || tx.instructions.len() > 12 {
        return Err(ValidatorError::new(
            "expected 3 to 12 instructions for UNSTAKE",
        ));
    }
    require_no_extra_budget_prefix(&tx.instructions)?;
    let deactivates = &tx.instructions[2..];
    if deactivates.is_empty() || deactivates.len() > 10 {
        return Err(ValidatorError::new("expected 1 to 10 Deactivate instructions"));
    }
    for ix in deactivates {
        if ix.discriminator != Discriminator::StakeDeactivate {
            return Err(ValidatorError::new("expected only Stake Deactivate instructions after the budget prefix"));
        }
        let authority = account_pubkey(ix, 2)?;
        if authority != user {
            return Err(ValidatorError::new("Deactivate authority does not match user address"));
        }
    }
    Ok(())
}

fn validate_withdraw(tx: &SolanaTransaction, user: &str, withdraw_all: bool) -> Result<(), ValidatorError> {
    require_no_extra_budget_prefix(&tx.instructions)?;
    let withdraws = &tx.instructions[2..];
    if withdraw_all {
        if withdraws.len() < 2 {
            return Err(ValidatorError::new("expected at least 2 Withdraw instructions for WITHDRAW_ALL"));
        }
    } else if withdraws.len() != 1 {
        return Err(ValidatorError::new("expected exactly 1 Withdraw instruction for WITHDRAW"));
    }
    for ix in withdraws {
        if ix.discriminator != Discriminator::StakeWithdraw {
            return Err(ValidatorError::new("expected only Stake Withdraw instructions after the budget prefix"));
        }
        let recipient = account_pubkey(ix, 1)?;
        if recipient != user {
            return Err(ValidatorError::new("Withdraw recipient does not match user address"));
        }
        let authority = account_pubkey(ix, 4)?;
        if authority != user {
            return Err(ValidatorError::new("Withdraw authority does not match user address"));
        }
    }
    Ok(())
}

fn validate_split(tx: &SolanaTransaction, user: &str) -> Result<(), ValidatorError> {
    if tx.instructions.len() != 6 {
        return Err(ValidatorError::new("expected exactly 6 instructions for SPLIT"));
    }
    require_no_extra_budget_prefix(&tx.instructions)?;
    let allocate = &tx.instructions[2];
    let transfer = &tx.instructions[3];
    let split = &tx.instructions[4];
    let deactivate = &tx.instructions[5];

    if allocate.discriminator != Discriminator::SystemAllocateWithSeed {
        return Err(ValidatorError::new("expected AllocateWithSeed at position 3"));
    }
    if transfer.discriminator != Discriminator::SystemTransfer {
        return Err(ValidatorError::new("expected Transfer at position 4"));
    }
    if split.discriminator != Discriminator::StakeSplit {
        return Err(ValidatorError::new("expected Stake Split at position 5"));
    }
    if deactivate.discriminator != Discriminator::StakeDeactivate {
        return Err(ValidatorError::new("expected Stake Deactivate at position 6"));
    }

    let allocate_source = account_pubkey(allocate, 1)?;
    if allocate_source != user {
        return Err(ValidatorError::new("AllocateWithSeed source does not match user address"));
    }
    let new_stake = account_pubkey(allocate, 0)?.to_string();

    let transfer_from = account_pubkey(transfer, 0)?;
    let transfer_to = account_pubkey(transfer, 1)?;
    if transfer_from != user {
        return Err(ValidatorError::new("Transfer source does not match user address"));
    }
    if transfer_to != new_stake {
        return Err(ValidatorError::new("Transfer destination does not match the new stake account"));
    }

    let split_stake = account_pubkey(split, 1)?;
    if split_stake != new_stake {
        return Err(ValidatorError::new("Split target does not match the new stake account"));
    }
    let split_authority = account_pubkey(split, 2)?;
    if split_authority != user {
        return Err(ValidatorError::new("Split authority does not match user address"));
    }

    let deactivate_stake = account_pubkey(deactivate, 0)?;
    if deactivate_stake != new_stake {
        return Err(ValidatorError::new("Deactivate does not target the new stake account"));
    }
    let deactivate_authority = account_pubkey(deactivate, 2)?;
    if deactivate_authority != user {
        return Err(ValidatorError::new("Deactivate authority does not match user address"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::solana::AccountRef;

    fn account(pubkey: &str, is_signer: bool, is_writable: bool) -> AccountRef {
        AccountRef {
            pubkey: pubkey.to_string(),
            is_signer,
            is_writable,
        }
    }

    fn budget_ix(discriminator: Discriminator) -> SolanaInstruction {
        SolanaInstruction {
            program_id: "ComputeBudget111111111111111111111111111111".to_string(),
            discriminator,
            data: vec![],
            accounts: vec![],
        }
    }

    #[test]
    fn unstake_rejects_wrong_deactivate_authority() {
        let user = "User11111111111111111111111111111111111111";
        let deactivate = SolanaInstruction {
            program_id: "Stake11111111111111111111111111111111111111".to_string(),
            discriminator: Discriminator::StakeDeactivate,
            data: vec![],
            accounts: vec![
                account("stake", false, true),
                account("clock", false, false),
                account("NotUser1111111111111111111111111111111111", true, false),
            ],
        };
        let tx = SolanaTransaction {
            instructions: vec![
                budget_ix(Discriminator::ComputeBudgetSetComputeUnitLimit),
                budget_ix(Discriminator::ComputeBudgetSetComputeUnitPrice),
                deactivate,
            ],
        };
        let err = validate_unstake(&tx, user).unwrap_err();
        assert!(err.reason.contains("does not match user address"));
    }

    #[test]
    fn stake_rejects_missing_initialize_instruction() {
        let user = "User11111111111111111111111111111111111111";
        let tx = SolanaTransaction {
            instructions: vec![
                budget_ix(Discriminator::ComputeBudgetSetComputeUnitLimit),
                budget_ix(Discriminator::ComputeBudgetSetComputeUnitPrice),
                SolanaInstruction {
                    program_id: "11111111111111111111111111111111".to_string(),
                    discriminator: Discriminator::SystemCreateAccountWithSeed,
                    data: vec![],
                    accounts: vec![account(user, true, true), account("new-stake", false, true)],
                },
                SolanaInstruction {
                    program_id: "Stake11111111111111111111111111111111111111".to_string(),
                    discriminator: Discriminator::StakeDelegate,
                    data: vec![],
                    accounts: vec![],
                },
            ],
        };
        let err = validate_stake(&tx, user, &ValidationArgs::default()).unwrap_err();
        assert!(err.reason.contains("No matching") || err.reason.contains("5 instructions"));
    }

    #[test]
    fn withdraw_all_accepts_two_withdraws() {
        let user = "User11111111111111111111111111111111111111";
        let withdraw = |stake: &str| SolanaInstruction {
            program_id: "Stake11111111111111111111111111111111111111".to_string(),
            discriminator: Discriminator::StakeWithdraw,
            data: vec![],
            accounts: vec![
                account(stake, false, true),
                account(user, false, true),
                account("clock", false, false),
                account("history", false, false),
                account(user, true, false),
            ],
        };
        let tx = SolanaTransaction {
            instructions: vec![
                budget_ix(Discriminator::ComputeBudgetSetComputeUnitLimit),
                budget_ix(Discriminator::ComputeBudgetSetComputeUnitPrice),
                withdraw("stake-a"),
                withdraw("stake-b"),
            ],
        };
        assert!(validate_withdraw(&tx, user, true).is_ok());
    }
}
