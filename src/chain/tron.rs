//! Tron transaction decoding (C1) and contract introspection (C2).
//!
//! Tron transactions arrive as a JSON raw-data envelope; the first
//! contract's `type` is the discriminated variant tag and its
//! `parameter.value` carries the typed fields. Addresses are hex with a
//! leading network byte (`0x41` on mainnet); [`hex_to_base58`]/[`base58_to_hex`]
//! convert between that form and base58check for comparison, the same
//! double-SHA256-checksum scheme Tron tooling elsewhere in this codebase's
//! lineage already implements.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::DecodeError;
use crate::types::TronResource;

/// The closed set of Tron contract type tags this validator set understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractType {
    VoteWitnessContract,
    FreezeBalanceV2Contract,
    UnfreezeBalanceV2Contract,
    UnDelegateResourceContract,
    UnfreezeBalanceContract,
    WithdrawExpireUnfreezeContract,
    WithdrawBalanceContract,
    Other(String),
}

impl ContractType {
    fn from_tag(tag: &str) -> ContractType {
        use ContractType::*;
        match tag {
            "VoteWitnessContract" => VoteWitnessContract,
            "FreezeBalanceV2Contract" => FreezeBalanceV2Contract,
            "UnfreezeBalanceV2Contract" => UnfreezeBalanceV2Contract,
            "UnDelegateResourceContract" => UnDelegateResourceContract,
            "UnfreezeBalanceContract" => UnfreezeBalanceContract,
            "WithdrawExpireUnfreezeContract" => WithdrawExpireUnfreezeContract,
            "WithdrawBalanceContract" => WithdrawBalanceContract,
            other => Other(other.to_string()),
        }
    }
}

/// A single Tron vote entry within a `VoteWitnessContract`.
#[derive(Debug, Clone)]
pub struct Vote {
    pub vote_address: String,
    pub vote_count: f64,
}

/// A decoded Tron transaction: the first contract's type and typed value fields.
#[derive(Debug, Clone)]
pub struct TronTransaction {
    pub contract_type: ContractType,
    pub owner_address: Option<String>,
    pub votes: Vec<Vote>,
    pub resource: Option<TronResource>,
    pub frozen_balance: Option<Value>,
    pub unfreeze_balance: Option<Value>,
    pub balance: Option<Value>,
    /// Raw `parameter.value` object, for fields not lifted into named slots above.
    pub raw_value: Value,
}

/// Decodes a JSON-encoded Tron raw-data envelope per spec.md §4.1.
pub fn decode(raw: &str) -> Result<TronTransaction, DecodeError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| DecodeError::MalformedJson(e.to_string()))?;

    let contract = value
        .get("raw_data")
        .and_then(|rd| rd.get("contract"))
        .and_then(Value::as_array)
        .and_then(|contracts| contracts.first())
        .ok_or_else(|| {
            DecodeError::MalformedTronTransaction("missing raw_data.contract[0]".to_string())
        })?;

    let tag = contract
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::MalformedTronTransaction("missing contract type".to_string()))?;
    let contract_type = ContractType::from_tag(tag);

    let raw_value = contract
        .get("parameter")
        .and_then(|p| p.get("value"))
        .cloned()
        .unwrap_or(Value::Null);

    let owner_address = raw_value
        .get("owner_address")
        .and_then(Value::as_str)
        .map(str::to_string);

    let votes = raw_value
        .get("votes")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|v| {
                    let vote_address = v.get("vote_address")?.as_str()?.to_string();
                    let vote_count = v.get("vote_count")?.as_f64()?;
                    Some(Vote { vote_address, vote_count })
                })
                .collect()
        })
        .unwrap_or_default();

    let resource = match raw_value.get("resource").and_then(Value::as_str) {
        None => Some(TronResource::Bandwidth),
        Some("BANDWIDTH") => Some(TronResource::Bandwidth),
        Some("ENERGY") => Some(TronResource::Energy),
        Some(_) => None,
    };

    Ok(TronTransaction {
        contract_type,
        owner_address,
        votes,
        resource,
        frozen_balance: raw_value.get("frozen_balance").cloned(),
        unfreeze_balance: raw_value.get("unfreeze_balance").cloned(),
        balance: raw_value.get("balance").cloned(),
        raw_value,
    })
}

fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Converts a hex address (with leading `0x41` network byte) to base58check.
pub fn hex_to_base58(hex_addr: &str) -> Option<String> {
    let stripped = hex_addr.strip_prefix("0x").unwrap_or(hex_addr);
    let bytes = hex::decode(stripped).ok()?;
    let hash1 = sha256(&bytes);
    let hash2 = sha256(&hash1);
    let checksum = &hash2[0..4];
    let mut with_checksum = bytes;
    with_checksum.extend_from_slice(checksum);
    Some(bs58::encode(&with_checksum).into_string())
}

/// Converts a base58check address back to its hex form (with network byte, no `0x` prefix).
pub fn base58_to_hex(address: &str) -> Option<String> {
    let decoded = bs58::decode(address).into_vec().ok()?;
    if decoded.len() < 5 {
        return None;
    }
    let (data, checksum) = decoded.split_at(decoded.len() - 4);
    let hash1 = sha256(data);
    let hash2 = sha256(&hash1);
    if &hash2[0..4] != checksum {
        return None;
    }
    Some(hex::encode(data))
}

/// Compares two Tron addresses for equality regardless of hex/base58 form.
pub fn addresses_match(a: &str, b: &str) -> bool {
    let normalize = |s: &str| -> Option<String> {
        if s.starts_with("41") || s.starts_with("0x41") {
            hex_to_base58(s)
        } else {
            Some(s.to_string())
        }
    };
    match (normalize(a), normalize(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
