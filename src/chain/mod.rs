//! Per-chain transaction decoders and calldata/instruction introspectors (C1/C2).

pub mod evm;
pub mod solana;
pub mod tron;

use crate::error::DecodeError;

/// Which chain family a validator operates on; determines how
/// `unsigned_tx_bytes` is decoded before any op is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFamily {
    Evm,
    Solana,
    Tron,
}

/// A transaction decoded into one of the three supported neutral shapes.
#[derive(Debug, Clone)]
pub enum DecodedTx {
    Evm(evm::EvmTransaction),
    Solana(solana::SolanaTransaction),
    Tron(tron::TronTransaction),
}

impl DecodedTx {
    pub fn decode(family: ChainFamily, raw: &str) -> Result<Self, DecodeError> {
        match family {
            ChainFamily::Evm => evm::decode(raw).map(DecodedTx::Evm),
            ChainFamily::Solana => solana::decode(raw).map(DecodedTx::Solana),
            ChainFamily::Tron => tron::decode(raw).map(DecodedTx::Tron),
        }
    }

    pub fn as_evm(&self) -> Option<&evm::EvmTransaction> {
        match self {
            DecodedTx::Evm(tx) => Some(tx),
            _ => None,
        }
    }

    pub fn as_solana(&self) -> Option<&solana::SolanaTransaction> {
        match self {
            DecodedTx::Solana(tx) => Some(tx),
            _ => None,
        }
    }

    pub fn as_tron(&self) -> Option<&tron::TronTransaction> {
        match self {
            DecodedTx::Tron(tx) => Some(tx),
            _ => None,
        }
    }
}
