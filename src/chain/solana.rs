//! Solana transaction decoding (C1) and instruction introspection (C2).
//!
//! Transactions arrive as a hex-encoded, `bincode`-serialized legacy
//! transaction — the same wire format the teacher's Solana scheme
//! handlers deserialize before inspecting instructions positionally
//! (compute-budget, then stake/system instructions at fixed indices).

use solana_message::VersionedMessage;
use solana_pubkey::Pubkey;
use solana_transaction::versioned::VersionedTransaction;
use std::str::FromStr;

use crate::error::DecodeError;

pub const STAKE_PROGRAM_ID: &str = "Stake11111111111111111111111111111111111111";
pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
pub const COMPUTE_BUDGET_PROGRAM_ID: &str = "ComputeBudget111111111111111111111111111111";

/// The discriminator table from spec.md §4.1, exhaustive for the supported set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    StakeInitialize,
    StakeAuthorize,
    StakeDelegate,
    StakeSplit,
    StakeWithdraw,
    StakeDeactivate,
    StakeCreateAccountWithSeed,
    SystemCreateAccount,
    SystemAssign,
    SystemTransfer,
    SystemCreateAccountWithSeed,
    SystemAllocate,
    SystemAllocateWithSeed,
    ComputeBudgetSetComputeUnitLimit,
    ComputeBudgetSetComputeUnitPrice,
    Unknown,
}

impl Discriminator {
    fn from_program_and_tag(program_id: &str, tag: u8) -> Discriminator {
        use Discriminator::*;
        match (program_id, tag) {
            (STAKE_PROGRAM_ID, 0) => StakeInitialize,
            (STAKE_PROGRAM_ID, 1) => StakeAuthorize,
            (STAKE_PROGRAM_ID, 2) => StakeDelegate,
            (STAKE_PROGRAM_ID, 3) => StakeSplit,
            (STAKE_PROGRAM_ID, 4) => StakeWithdraw,
            (STAKE_PROGRAM_ID, 5) => StakeDeactivate,
            (STAKE_PROGRAM_ID, 10) => StakeCreateAccountWithSeed,
            (SYSTEM_PROGRAM_ID, 0) => SystemCreateAccount,
            (SYSTEM_PROGRAM_ID, 1) => SystemAssign,
            (SYSTEM_PROGRAM_ID, 2) => SystemTransfer,
            (SYSTEM_PROGRAM_ID, 3) => SystemCreateAccountWithSeed,
            (SYSTEM_PROGRAM_ID, 8) => SystemAllocate,
            (SYSTEM_PROGRAM_ID, 9) => SystemAllocateWithSeed,
            (COMPUTE_BUDGET_PROGRAM_ID, 2) => ComputeBudgetSetComputeUnitLimit,
            (COMPUTE_BUDGET_PROGRAM_ID, 3) => ComputeBudgetSetComputeUnitPrice,
            _ => Unknown,
        }
    }
}

/// One account reference within an instruction, in the order it appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRef {
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// A single decoded Solana instruction.
#[derive(Debug, Clone)]
pub struct SolanaInstruction {
    pub program_id: String,
    pub discriminator: Discriminator,
    pub data: Vec<u8>,
    pub accounts: Vec<AccountRef>,
}

impl SolanaInstruction {
    pub fn account(&self, index: usize) -> Option<&AccountRef> {
        self.accounts.get(index)
    }
}

/// A decoded Solana transaction: an ordered instruction list.
#[derive(Debug, Clone)]
pub struct SolanaTransaction {
    pub instructions: Vec<SolanaInstruction>,
}

/// Decodes a hex-encoded, bincode-serialized legacy Solana transaction.
pub fn decode(raw: &str) -> Result<SolanaTransaction, DecodeError> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(stripped).map_err(|e| DecodeError::MalformedHex(e.to_string()))?;
    let tx: VersionedTransaction = bincode::deserialize(&bytes)
        .map_err(|e| DecodeError::MalformedSolanaTransaction(e.to_string()))?;

    let message: &solana_message::Message = match &tx.message {
        VersionedMessage::Legacy(message) => message,
        VersionedMessage::V0(_) => return Err(DecodeError::UnsupportedSolanaMessageFormat),
    };

    let account_keys = &message.account_keys;
    let num_accounts = account_keys.len();
    let num_required_signatures = message.header.num_required_signatures as usize;
    let num_readonly_signed = message.header.num_readonly_signed_accounts as usize;
    let num_readonly_unsigned = message.header.num_readonly_unsigned_accounts as usize;

    let is_writable = |index: usize| -> bool {
        if index >= num_accounts {
            return false;
        }
        if index < num_required_signatures {
            index < num_required_signatures.saturating_sub(num_readonly_signed)
        } else {
            let unsigned_index = index - num_required_signatures;
            let num_unsigned = num_accounts - num_required_signatures;
            unsigned_index < num_unsigned.saturating_sub(num_readonly_unsigned)
        }
    };

    let mut instructions = Vec::with_capacity(message.instructions.len());
    for compiled in &message.instructions {
        let program_id = account_keys
            .get(compiled.program_id_index as usize)
            .ok_or_else(|| {
                DecodeError::MalformedSolanaTransaction("program_id_index out of range".into())
            })?;
        let program_id_string = program_id.to_string();
        let tag = compiled.data.first().copied().unwrap_or(0);
        let discriminator = Discriminator::from_program_and_tag(&program_id_string, tag);

        let mut accounts = Vec::with_capacity(compiled.accounts.len());
        for &account_index in &compiled.accounts {
            let account_index = account_index as usize;
            let pubkey = account_keys.get(account_index).ok_or_else(|| {
                DecodeError::MalformedSolanaTransaction("account index out of range".into())
            })?;
            accounts.push(AccountRef {
                pubkey: pubkey.to_string(),
                is_signer: account_index < num_required_signatures,
                is_writable: is_writable(account_index),
            });
        }

        instructions.push(SolanaInstruction {
            program_id: program_id_string,
            discriminator,
            data: compiled.data.clone(),
            accounts,
        });
    }

    Ok(SolanaTransaction { instructions })
}

/// Parses a base58 string into a [`Pubkey`], used when comparing against caller-supplied hints.
pub fn parse_pubkey(s: &str) -> Option<Pubkey> {
    Pubkey::from_str(s).ok()
}
