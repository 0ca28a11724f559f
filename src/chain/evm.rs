//! EVM transaction decoding (C1) and ABI calldata introspection (C2).
//!
//! The "tampering equality invariant" lives here: [`decode_call`] parses
//! calldata against a single known [`SolCall`] signature, re-encodes the
//! decoded call, and requires an exact byte-for-byte match against the
//! original bytes. Any deviation — appended bytes, altered padding, a
//! truncated selector — surfaces as [`ValidatorError::tampered`], never as
//! a decoder quirk to paper over.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use serde_json::Value;

use crate::error::{DecodeError, ValidatorError};

/// An EVM transaction normalized for validation.
///
/// Addresses are lower-cased, `value` is a big integer (`0` when absent),
/// and `data` is the canonical (possibly empty) calldata hex string.
#[derive(Debug, Clone)]
pub struct EvmTransaction {
    pub to: Option<String>,
    pub from: Option<String>,
    pub value: U256,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl EvmTransaction {
    pub fn to_matches(&self, address: &str) -> bool {
        self.to
            .as_deref()
            .is_some_and(|to| to.eq_ignore_ascii_case(address))
    }

    pub fn from_matches(&self, address: &str) -> bool {
        self.from
            .as_deref()
            .is_some_and(|from| from.eq_ignore_ascii_case(address))
    }
}

/// Decodes a JSON-encoded EVM transaction per spec.md §4.1.
pub fn decode(raw: &str) -> Result<EvmTransaction, DecodeError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| DecodeError::MalformedJson(e.to_string()))?;

    let chain_id = value
        .get("chainId")
        .or_else(|| value.get("chain_id"))
        .ok_or(DecodeError::MissingChainId)
        .and_then(parse_u64)?;

    let to = value
        .get("to")
        .and_then(Value::as_str)
        .map(|s| s.to_lowercase());
    let from = value
        .get("from")
        .and_then(Value::as_str)
        .map(|s| s.to_lowercase());

    let value_field = value.get("value");
    let tx_value = match value_field {
        None | Some(Value::Null) => U256::ZERO,
        Some(v) => parse_u256(v)?,
    };

    let data = match value.get("data").and_then(Value::as_str) {
        Some(s) if !s.is_empty() => {
            let stripped = s.strip_prefix("0x").unwrap_or(s);
            hex::decode(stripped).map_err(|e| DecodeError::MalformedHex(e.to_string()))?
        }
        _ => Vec::new(),
    };

    Ok(EvmTransaction {
        to,
        from,
        value: tx_value,
        data,
        chain_id,
    })
}

fn parse_u64(value: &Value) -> Result<u64, DecodeError> {
    match value {
        Value::Number(n) => n.as_u64().ok_or(DecodeError::MissingChainId),
        Value::String(s) => parse_int_str(s).ok_or(DecodeError::MissingChainId),
        _ => Err(DecodeError::MissingChainId),
    }
}

fn parse_int_str(s: &str) -> Option<u64> {
    if let Some(hex_digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex_digits, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn parse_u256(value: &Value) -> Result<U256, DecodeError> {
    match value {
        Value::Number(n) => {
            let s = n.to_string();
            U256::from_str_radix(&s, 10).map_err(|e| DecodeError::MalformedHex(e.to_string()))
        }
        Value::String(s) => {
            if let Some(hex_digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                let digits = if hex_digits.is_empty() { "0" } else { hex_digits };
                U256::from_str_radix(digits, 16).map_err(|e| DecodeError::MalformedHex(e.to_string()))
            } else {
                U256::from_str_radix(s, 10).map_err(|e| DecodeError::MalformedHex(e.to_string()))
            }
        }
        _ => Err(DecodeError::MalformedHex("value must be a string or number".to_string())),
    }
}

/// Decodes `data` as exactly one known ABI call and enforces the
/// re-encoding equality invariant (spec.md §4.2, §9).
///
/// Returns `Err` with a "calldata has been tampered with" reason when the
/// decoded call, re-encoded, does not reproduce `data` byte-for-byte;
/// returns `Err` with an "unknown method" reason when the selector does
/// not match `C::SELECTOR` at all.
pub fn decode_call<C: SolCall>(data: &[u8]) -> Result<C, ValidatorError> {
    let selector: Option<[u8; 4]> = data.get(0..4).and_then(|s| s.try_into().ok());
    if selector != Some(C::SELECTOR) {
        return Err(ValidatorError::new("calldata does not match the expected method selector"));
    }
    let call = C::abi_decode(data)
        .map_err(|e| ValidatorError::new(format!("failed to decode calldata: {e}")))?;
    let reencoded = call.abi_encode();
    if reencoded != data {
        return Err(ValidatorError::tampered(reencoded.len(), data.len()));
    }
    Ok(call)
}

/// Compares a decoded ABI [`Address`] argument against a caller-supplied address string.
pub fn address_matches(addr: Address, user: &str) -> bool {
    format!("{addr:#x}").eq_ignore_ascii_case(user)
}

/// Parses a `0x`-prefixed lower-case address string into an [`Address`], if well-formed.
pub fn parse_address(s: &str) -> Option<Address> {
    s.parse().ok()
}
