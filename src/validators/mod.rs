//! Per-yield validators (C3) and their tagged-enum registry entry.
//!
//! The registry models polymorphism as a closed sum type rather than trait
//! objects: each validator kind is its own struct, and [`AnyValidator`]
//! matches on the variant to dispatch `supported_ops()`/`validate()`. There
//! is a fixed, known set of validator kinds, so a tagged enum captures the
//! shape without the indirection of `Box<dyn _>`.

pub mod erc4626;
pub mod lido;
pub mod solana_stake;
pub mod tron_stake;

use std::fmt;

use crate::chain::{ChainFamily, DecodedTx};
use crate::error::ValidatorError;
use crate::types::{OperationKind, ValidationArgs, ValidationContext};

/// One entry in the immutable yield_id -> validator registry.
#[derive(Debug, Clone)]
pub enum AnyValidator {
    Lido(lido::LidoValidator),
    Erc4626(erc4626::Erc4626Validator),
    SolanaStake(solana_stake::SolanaStakeValidator),
    TronStake(tron_stake::TronStakeValidator),
}

impl AnyValidator {
    pub fn chain_family(&self) -> ChainFamily {
        match self {
            AnyValidator::Lido(_) | AnyValidator::Erc4626(_) => ChainFamily::Evm,
            AnyValidator::SolanaStake(_) => ChainFamily::Solana,
            AnyValidator::TronStake(_) => ChainFamily::Tron,
        }
    }

    pub fn supported_ops(&self) -> &[OperationKind] {
        match self {
            AnyValidator::Lido(v) => v.supported_ops(),
            AnyValidator::Erc4626(v) => v.supported_ops(),
            AnyValidator::SolanaStake(v) => v.supported_ops(),
            AnyValidator::TronStake(v) => v.supported_ops(),
        }
    }

    pub fn validate(
        &self,
        tx: &DecodedTx,
        op: OperationKind,
        user_address: &str,
        args: &ValidationArgs,
        ctx: &ValidationContext,
    ) -> Result<(), ValidatorError> {
        match self {
            AnyValidator::Lido(v) => v.validate(tx, op, user_address, args, ctx),
            AnyValidator::Erc4626(v) => v.validate(tx, op, user_address, args, ctx),
            AnyValidator::SolanaStake(v) => v.validate(tx, op, user_address, args, ctx),
            AnyValidator::TronStake(v) => v.validate(tx, op, user_address, args, ctx),
        }
    }

    /// A short kind identifier, used in log fields rather than the yield id itself.
    pub fn kind_id(&self) -> &'static str {
        match self {
            AnyValidator::Lido(_) => "lido",
            AnyValidator::Erc4626(_) => "erc4626",
            AnyValidator::SolanaStake(_) => "solana_stake",
            AnyValidator::TronStake(_) => "tron_stake",
        }
    }
}

impl fmt::Display for AnyValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind_id())
    }
}
