//! Crate-wide error taxonomy.
//!
//! Mirrors the split the teacher draws between on-chain/off-chain failure:
//! a [`DecodeError`] is a hard failure to even parse the raw transaction
//! bytes (C1), while a [`ValidatorError`] is the "this op did not match"
//! signal a validator returns instead of throwing (C3). Neither aborts the
//! dispatch loop in [`crate::dispatch`]; only [`EnvelopeError`] ever reaches
//! the outside world as a non-2xx-shaped response.

use serde_json::Value;

/// Failure to decode a chain's raw transaction bytes into a neutral structure.
#[derive(thiserror::Error, Debug, Clone)]
pub enum DecodeError {
    #[error("malformed JSON transaction: {0}")]
    MalformedJson(String),
    #[error("missing or non-numeric chainId")]
    MissingChainId,
    #[error("malformed hex transaction bytes: {0}")]
    MalformedHex(String),
    #[error("malformed Solana transaction: {0}")]
    MalformedSolanaTransaction(String),
    #[error("unsupported Solana message format (only legacy messages are accepted)")]
    UnsupportedSolanaMessageFormat,
    #[error("malformed Tron transaction: {0}")]
    MalformedTronTransaction(String),
}

/// The error a validator's `validate()` returns for an operation that did not match.
///
/// This is never propagated as a crate-level failure: the dispatch loop in
/// [`crate::dispatch`] folds every `ValidatorError` into an `attempts` trace
/// entry and decides the overall outcome from the set of successful matches.
#[derive(Debug, Clone)]
pub struct ValidatorError {
    pub reason: String,
    pub details: Option<Value>,
}

impl ValidatorError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            details: None,
        }
    }

    pub fn with_details(reason: impl Into<String>, details: Value) -> Self {
        Self {
            reason: reason.into(),
            details: Some(details),
        }
    }

    /// The "calldata has been tampered with" shape required by the EVM
    /// re-encoding equality invariant (spec.md §4.2, §8 property 5).
    pub fn tampered(expected_length: usize, actual_length: usize) -> Self {
        Self::with_details(
            "calldata has been tampered with",
            serde_json::json!({
                "expectedLength": expected_length,
                "actualLength": actual_length,
                "lengthDiff": actual_length as i64 - expected_length as i64,
            }),
        )
    }
}

impl From<DecodeError> for ValidatorError {
    fn from(value: DecodeError) -> Self {
        ValidatorError::new(value.to_string())
    }
}

impl std::fmt::Display for ValidatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for ValidatorError {}

/// The closed set of envelope-level error codes (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvelopeErrorCode {
    ParseError,
    SchemaValidationError,
    MissingRequiredField,
    InternalError,
}

/// An error that aborts envelope processing before a [`crate::envelope::ValidateResult`]
/// (or equivalent per-operation result) can be produced.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{message}")]
pub struct EnvelopeError {
    pub code: EnvelopeErrorCode,
    pub message: String,
    pub details: Option<Value>,
}

impl EnvelopeError {
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: EnvelopeErrorCode::ParseError,
            message: message.into(),
            details: None,
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self {
            code: EnvelopeErrorCode::SchemaValidationError,
            message: message.into(),
            details: None,
        }
    }

    pub fn missing_field(field: &str) -> Self {
        Self {
            code: EnvelopeErrorCode::MissingRequiredField,
            message: format!("missing required field: {field}"),
            details: None,
        }
    }

    pub fn internal() -> Self {
        Self {
            code: EnvelopeErrorCode::InternalError,
            message: "internal error".to_string(),
            details: None,
        }
    }
}
