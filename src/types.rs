//! Chain-agnostic data model shared by every component (spec.md §3).
//!
//! These are the types that flow from the request envelope (C6) down
//! through dispatch (C5) into the per-yield validators (C3). They are kept
//! separate from the wire-format request/response structs in
//! [`crate::envelope`] only where the wire format differs (camelCase JSON
//! vs. the internal snake_case names); [`ValidationArgs`] and
//! [`ValidationContext`] are used as-is on the wire, the way the teacher
//! reuses `PaymentPayload` directly as both the internal and wire type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of operation kinds a validator can recognize (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Stake,
    Unstake,
    ClaimUnstaked,
    ClaimRewards,
    Vote,
    Withdraw,
    WithdrawAll,
    Split,
    Approval,
    Supply,
    Wrap,
    Unwrap,
    FreezeBandwidth,
    FreezeEnergy,
    UnfreezeBandwidth,
    UnfreezeEnergy,
    UndelegateBandwidth,
    UndelegateEnergy,
    UnfreezeLegacyBandwidth,
    UnfreezeLegacyEnergy,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_value(self).unwrap_or_default();
        write!(f, "{}", json.as_str().unwrap_or("UNKNOWN"))
    }
}

/// Tron resource kind referenced by freeze/unfreeze/undelegate operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TronResource {
    Bandwidth,
    Energy,
}

/// Optional caller-supplied hints (spec.md §6 `args`). Closed record: any
/// field not named here is rejected by the envelope schema check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ValidationArgs {
    pub validator_address: Option<String>,
    pub validator_addresses: Option<Vec<String>>,
    pub amount: Option<String>,
    pub tron_resource: Option<TronResource>,
    pub provider_id: Option<String>,
    pub duration: Option<f64>,
    pub input_token: Option<String>,
    pub subnet_id: Option<f64>,
    pub fee_configuration_id: Option<String>,
    pub cosmos_pub_key: Option<String>,
    pub tezos_pub_key: Option<String>,
    pub nominator_address: Option<String>,
    pub nft_ids: Option<Vec<String>>,
}

/// A single fee-configuration hint (spec.md §6 `context.feeConfiguration[]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct FeeConfiguration {
    pub deposit_fee_bps: Option<u16>,
    pub fee_recipient_address: Option<String>,
    pub allocator_vault_address: Option<String>,
}

/// Optional fee-configuration context (spec.md §6 `context`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ValidationContext {
    pub fee_configuration: Option<Vec<FeeConfiguration>>,
}

impl ValidationContext {
    /// Allocator vault addresses named in fee-configuration hints, lower-cased.
    pub fn allocator_vault_addresses(&self) -> Vec<String> {
        self.fee_configuration
            .iter()
            .flatten()
            .filter_map(|fc| fc.allocator_vault_address.as_deref())
            .map(|a| a.to_lowercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_kind_round_trips_through_json() {
        let value = serde_json::to_value(OperationKind::ClaimUnstaked).unwrap();
        assert_eq!(value, serde_json::json!("CLAIM_UNSTAKED"));
        let back: OperationKind = serde_json::from_value(value).unwrap();
        assert_eq!(back, OperationKind::ClaimUnstaked);
    }

    #[test]
    fn operation_kind_display_matches_wire_name() {
        assert_eq!(OperationKind::FreezeBandwidth.to_string(), "FREEZE_BANDWIDTH");
    }

    #[test]
    fn validation_args_rejects_unknown_fields() {
        let json = serde_json::json!({"maliciousField": "x"});
        let result: Result<ValidationArgs, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }
}
