//! Auto-detect dispatch core (C5, spec.md §4.7).
//!
//! A validator never aborts this loop: every op attempt, whether it
//! returns `Err` or panics, becomes an entry in the attempts trace, and the
//! final outcome is decided from the *set* of successful matches only.

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use serde_json::Value;

use crate::chain::DecodedTx;
use crate::error::ValidatorError;
use crate::registry::Registry;
use crate::types::{OperationKind, ValidationArgs, ValidationContext};

/// One op attempt recorded in the dispatch trace.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    #[serde(rename = "type")]
    pub op: OperationKind,
    pub reason: Option<String>,
}

/// The outcome of a single `validate` dispatch (spec.md §3 Validation result).
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    Safe {
        detected_type: OperationKind,
    },
    Blocked {
        reason: String,
        details: Option<Value>,
    },
}

/// Dispatches a decoded transaction against the validator registered for `yield_id`.
#[tracing::instrument(skip(registry, raw_tx, args, ctx), fields(yield_id))]
pub fn dispatch(
    registry: &Registry,
    yield_id: &str,
    raw_tx: &str,
    user_address: &str,
    args: &ValidationArgs,
    ctx: &ValidationContext,
) -> ValidationOutcome {
    let Some(validator) = registry.get(yield_id) else {
        tracing::warn!(yield_id, "unknown yield id");
        return ValidationOutcome::Blocked {
            reason: "Unknown yield ID".to_string(),
            details: None,
        };
    };
    if raw_tx.is_empty() || user_address.is_empty() {
        tracing::warn!(yield_id, "empty transaction or user address");
        return ValidationOutcome::Blocked {
            reason: "Invalid request parameters".to_string(),
            details: None,
        };
    }

    let family = validator.chain_family();
    let decoded = match DecodedTx::decode(family, raw_tx) {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::debug!(yield_id, validator = %validator, error = %err, "decode failed");
            let validator_err: ValidatorError = err.into();
            return ValidationOutcome::Blocked {
                reason: validator_err.reason,
                details: validator_err.details,
            };
        }
    };

    let mut trace: Vec<Attempt> = Vec::new();
    let mut matches: Vec<OperationKind> = Vec::new();

    for &op in validator.supported_ops() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            validator.validate(&decoded, op, user_address, args, ctx)
        }));
        match outcome {
            Ok(Ok(())) => {
                matches.push(op);
                trace.push(Attempt { op, reason: None });
            }
            Ok(Err(err)) => {
                trace.push(Attempt {
                    op,
                    reason: Some(err.reason),
                });
            }
            Err(panic) => {
                let message = panic_message(&panic);
                trace.push(Attempt {
                    op,
                    reason: Some(message),
                });
            }
        }
    }

    match matches.len() {
        1 => {
            tracing::debug!(yield_id, detected_type = %matches[0], "request classified");
            ValidationOutcome::Safe {
                detected_type: matches[0],
            }
        }
        0 => {
            tracing::debug!(yield_id, "no op pattern matched");
            ValidationOutcome::Blocked {
                reason: "No matching operation pattern found for this transaction".to_string(),
                details: Some(serde_json::json!({
                    "supportedTypes": validator.supported_ops(),
                    "attempts": trace,
                })),
            }
        }
        _ => {
            tracing::warn!(yield_id, matches = ?matches, "ambiguous match");
            ValidationOutcome::Blocked {
                reason: "Ambiguous transaction pattern detected: transaction matches multiple operation types"
                    .to_string(),
                details: Some(serde_json::json!({ "matchedTypes": matches })),
            }
        }
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "validator panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_yield_id_is_blocked() {
        let registry = Registry::build().unwrap();
        let outcome = dispatch(
            &registry,
            "does-not-exist",
            "{}",
            "0xuser",
            &ValidationArgs::default(),
            &ValidationContext::default(),
        );
        assert!(matches!(outcome, ValidationOutcome::Blocked { reason, .. } if reason == "Unknown yield ID"));
    }

    #[test]
    fn empty_tx_is_blocked() {
        let registry = Registry::build().unwrap();
        let outcome = dispatch(
            &registry,
            "ethereum-eth-lido-staking",
            "",
            "0xuser",
            &ValidationArgs::default(),
            &ValidationContext::default(),
        );
        assert!(matches!(outcome, ValidationOutcome::Blocked { reason, .. } if reason == "Invalid request parameters"));
    }

    #[test]
    fn unparseable_tx_surfaces_as_blocked_not_panic() {
        let registry = Registry::build().unwrap();
        let outcome = dispatch(
            &registry,
            "ethereum-eth-lido-staking",
            "not json",
            "0xuser",
            &ValidationArgs::default(),
            &ValidationContext::default(),
        );
        assert!(matches!(outcome, ValidationOutcome::Blocked { .. }));
    }
}
