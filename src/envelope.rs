//! Request/response envelope (C6, spec.md §4.8, §6).
//!
//! This is the only boundary that ever produces an `EnvelopeError`; a
//! `ValidationOutcome` from [`crate::dispatch`] always becomes a successful
//! envelope response, even when the result itself reports `isValid=false`.

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::{self, ValidationOutcome};
use crate::error::{EnvelopeError, EnvelopeErrorCode};
use crate::registry::Registry;
use crate::types::{ValidationArgs, ValidationContext};

/// Request envelopes exceeding this size are rejected before JSON parsing (spec.md §6).
pub const MAX_INPUT_BYTES: usize = 102_400;
const MAX_YIELD_ID_CHARS: usize = 256;
const MAX_USER_ADDRESS_CHARS: usize = 128;
const MAX_ARGS_STRING_CHARS: usize = 128;
const MAX_AMOUNT_CHARS: usize = 78;
const MAX_ARRAY_ITEMS: usize = 100;
const MAX_DEPOSIT_FEE_BPS: u16 = 10_000;
const API_VERSION: &str = "1.0";

/// The closed set of operations the envelope recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnvelopeOperation {
    Validate,
    IsSupported,
    GetSupportedYieldIds,
}

/// The closed request schema (spec.md §6). Unknown fields are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestEnvelope {
    pub api_version: String,
    pub operation: EnvelopeOperation,
    #[serde(default)]
    pub yield_id: Option<String>,
    #[serde(default)]
    pub unsigned_transaction: Option<String>,
    #[serde(default)]
    pub user_address: Option<String>,
    #[serde(default)]
    pub args: Option<ValidationArgs>,
    #[serde(default)]
    pub context: Option<ValidationContext>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseMeta {
    request_hash: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateResult {
    is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detected_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct IsSupportedResult {
    supported: bool,
    yield_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SupportedYieldIdsResult {
    yield_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum OperationResult {
    Validate(ValidateResult),
    IsSupported(IsSupportedResult),
    SupportedYieldIds(SupportedYieldIdsResult),
}

/// The response envelope, serialized exactly as spec.md §6 describes it.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    ok: bool,
    api_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<OperationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    meta: ResponseMeta,
}

#[derive(Debug, Clone, Serialize)]
struct ErrorBody {
    code: EnvelopeErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

fn request_hash(input_bytes: &[u8]) -> String {
    let digest = Sha256::digest(input_bytes);
    hex::encode(digest)
}

fn error_response(err: EnvelopeError, hash: String) -> ResponseEnvelope {
    ResponseEnvelope {
        ok: false,
        api_version: API_VERSION,
        result: None,
        error: Some(ErrorBody {
            code: err.code,
            message: err.message,
            details: err.details,
        }),
        meta: ResponseMeta { request_hash: hash },
    }
}

fn success_response(result: OperationResult, hash: String) -> ResponseEnvelope {
    ResponseEnvelope {
        ok: true,
        api_version: API_VERSION,
        result: Some(result),
        error: None,
        meta: ResponseMeta { request_hash: hash },
    }
}

/// Handles one JSON request end to end: size cap, parse, schema, required
/// fields, routing (spec.md §4.8 steps 1-6). Never panics outward — any
/// unexpected failure collapses to a generic `INTERNAL_ERROR`.
pub fn handle_json_request(registry: &Registry, input: &str) -> ResponseEnvelope {
    let hash = request_hash(input.as_bytes());

    if input.len() > MAX_INPUT_BYTES {
        tracing::warn!(len = input.len(), "request exceeds maximum size");
        return error_response(
            EnvelopeError::schema(format!(
                "request body exceeds maximum size of {MAX_INPUT_BYTES} bytes"
            )),
            hash,
        );
    }

    let envelope: RequestEnvelope = match serde_json::from_str(input) {
        Ok(envelope) => envelope,
        Err(err) if is_schema_violation(&err) => {
            return error_response(EnvelopeError::schema(err.to_string()), hash);
        }
        Err(err) => {
            return error_response(EnvelopeError::parse_error(err.to_string()), hash);
        }
    };

    if let Err(err) = validate_envelope_schema(&envelope) {
        return error_response(err, hash);
    }

    if let Err(err) = validate_required_fields(&envelope) {
        return error_response(err, hash);
    }

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        route(registry, &envelope)
    }));

    match outcome {
        Ok(result) => success_response(result, hash),
        Err(_) => {
            tracing::warn!("internal error while handling request");
            error_response(EnvelopeError::internal(), hash)
        }
    }
}

/// A `serde_json::Error` whose `classify()` is `Data` most often indicates an
/// out-of-range or mistyped field (a schema-level defect) rather than
/// unparseable JSON syntax.
fn is_schema_violation(err: &serde_json::Error) -> bool {
    matches!(err.classify(), serde_json::error::Category::Data)
}

fn validate_envelope_schema(envelope: &RequestEnvelope) -> Result<(), EnvelopeError> {
    if envelope.api_version != API_VERSION {
        return Err(EnvelopeError::schema(format!(
            "unsupported apiVersion: {}",
            envelope.api_version
        )));
    }
    if let Some(yield_id) = &envelope.yield_id {
        if yield_id.is_empty() || yield_id.chars().count() > MAX_YIELD_ID_CHARS {
            return Err(EnvelopeError::schema("yieldId must be 1..256 characters"));
        }
    }
    if let Some(tx) = &envelope.unsigned_transaction {
        if tx.is_empty() || tx.chars().count() > MAX_INPUT_BYTES {
            return Err(EnvelopeError::schema(
                "unsignedTransaction must be 1..102400 characters",
            ));
        }
    }
    if let Some(user_address) = &envelope.user_address {
        if user_address.is_empty() || user_address.chars().count() > MAX_USER_ADDRESS_CHARS {
            return Err(EnvelopeError::schema("userAddress must be 1..128 characters"));
        }
    }
    if let Some(args) = &envelope.args {
        validate_args_schema(args)?;
    }
    if let Some(context) = &envelope.context {
        validate_context_schema(context)?;
    }
    Ok(())
}

fn check_args_str(field: &str, value: &Option<String>) -> Result<(), EnvelopeError> {
    if let Some(s) = value {
        if s.chars().count() > MAX_ARGS_STRING_CHARS {
            return Err(EnvelopeError::schema(format!(
                "{field} must be at most {MAX_ARGS_STRING_CHARS} characters"
            )));
        }
    }
    Ok(())
}

fn check_number_non_negative(field: &str, value: Option<f64>) -> Result<(), EnvelopeError> {
    if let Some(n) = value {
        if n < 0.0 {
            return Err(EnvelopeError::schema(format!("{field} must be >= 0")));
        }
    }
    Ok(())
}

fn validate_args_schema(args: &ValidationArgs) -> Result<(), EnvelopeError> {
    check_args_str("args.validatorAddress", &args.validator_address)?;
    if let Some(addresses) = &args.validator_addresses {
        if addresses.len() > MAX_ARRAY_ITEMS {
            return Err(EnvelopeError::schema(format!(
                "args.validatorAddresses must contain at most {MAX_ARRAY_ITEMS} items"
            )));
        }
        for address in addresses {
            if address.chars().count() > MAX_ARGS_STRING_CHARS {
                return Err(EnvelopeError::schema(format!(
                    "args.validatorAddresses entries must be at most {MAX_ARGS_STRING_CHARS} characters"
                )));
            }
        }
    }
    if let Some(amount) = &args.amount {
        if amount.chars().count() > MAX_AMOUNT_CHARS {
            return Err(EnvelopeError::schema(format!(
                "args.amount must be at most {MAX_AMOUNT_CHARS} characters"
            )));
        }
    }
    check_args_str("args.providerId", &args.provider_id)?;
    check_number_non_negative("args.duration", args.duration)?;
    check_args_str("args.inputToken", &args.input_token)?;
    check_number_non_negative("args.subnetId", args.subnet_id)?;
    check_args_str("args.feeConfigurationId", &args.fee_configuration_id)?;
    check_args_str("args.cosmosPubKey", &args.cosmos_pub_key)?;
    check_args_str("args.tezosPubKey", &args.tezos_pub_key)?;
    check_args_str("args.nominatorAddress", &args.nominator_address)?;
    if let Some(nft_ids) = &args.nft_ids {
        if nft_ids.len() > MAX_ARRAY_ITEMS {
            return Err(EnvelopeError::schema(format!(
                "args.nftIds must contain at most {MAX_ARRAY_ITEMS} items"
            )));
        }
        for id in nft_ids {
            if id.chars().count() > MAX_ARGS_STRING_CHARS {
                return Err(EnvelopeError::schema(format!(
                    "args.nftIds entries must be at most {MAX_ARGS_STRING_CHARS} characters"
                )));
            }
        }
    }
    Ok(())
}

fn validate_context_schema(context: &ValidationContext) -> Result<(), EnvelopeError> {
    let Some(fee_configuration) = &context.fee_configuration else {
        return Ok(());
    };
    if fee_configuration.len() > MAX_ARRAY_ITEMS {
        return Err(EnvelopeError::schema(format!(
            "context.feeConfiguration must contain at most {MAX_ARRAY_ITEMS} items"
        )));
    }
    for fc in fee_configuration {
        if let Some(bps) = fc.deposit_fee_bps {
            if bps > MAX_DEPOSIT_FEE_BPS {
                return Err(EnvelopeError::schema(format!(
                    "context.feeConfiguration[].depositFeeBps must be 0..{MAX_DEPOSIT_FEE_BPS}"
                )));
            }
        }
        check_args_str(
            "context.feeConfiguration[].feeRecipientAddress",
            &fc.fee_recipient_address,
        )?;
        check_args_str(
            "context.feeConfiguration[].allocatorVaultAddress",
            &fc.allocator_vault_address,
        )?;
    }
    Ok(())
}

fn validate_required_fields(envelope: &RequestEnvelope) -> Result<(), EnvelopeError> {
    match envelope.operation {
        EnvelopeOperation::Validate => {
            if envelope.yield_id.is_none() {
                return Err(EnvelopeError::missing_field("yieldId"));
            }
            if envelope.unsigned_transaction.is_none() {
                return Err(EnvelopeError::missing_field("unsignedTransaction"));
            }
            if envelope.user_address.is_none() {
                return Err(EnvelopeError::missing_field("userAddress"));
            }
        }
        EnvelopeOperation::IsSupported => {
            if envelope.yield_id.is_none() {
                return Err(EnvelopeError::missing_field("yieldId"));
            }
        }
        EnvelopeOperation::GetSupportedYieldIds => {}
    }
    Ok(())
}

fn route(registry: &Registry, envelope: &RequestEnvelope) -> OperationResult {
    match envelope.operation {
        EnvelopeOperation::Validate => {
            let yield_id = envelope.yield_id.as_deref().unwrap_or_default();
            let tx = envelope.unsigned_transaction.as_deref().unwrap_or_default();
            let user_address = envelope.user_address.as_deref().unwrap_or_default();
            let args = envelope.args.clone().unwrap_or_default();
            let ctx = envelope.context.clone().unwrap_or_default();
            let outcome = dispatch::dispatch(registry, yield_id, tx, user_address, &args, &ctx);
            OperationResult::Validate(match outcome {
                ValidationOutcome::Safe { detected_type } => ValidateResult {
                    is_valid: true,
                    reason: None,
                    details: None,
                    detected_type: Some(detected_type.to_string()),
                },
                ValidationOutcome::Blocked { reason, details } => ValidateResult {
                    is_valid: false,
                    reason: Some(reason),
                    details,
                    detected_type: None,
                },
            })
        }
        EnvelopeOperation::IsSupported => {
            let yield_id = envelope.yield_id.clone().unwrap_or_default();
            let supported = registry.contains(&yield_id);
            OperationResult::IsSupported(IsSupportedResult { supported, yield_id })
        }
        EnvelopeOperation::GetSupportedYieldIds => {
            OperationResult::SupportedYieldIds(SupportedYieldIdsResult {
                yield_ids: registry.yield_ids(),
            })
        }
    }
}

/// Describes the request envelope's shape, for tooling that embeds this
/// crate and wants to introspect it without a running server (SPEC_FULL §4).
pub fn request_schema_info() -> Value {
    serde_json::json!({
        "apiVersion": API_VERSION,
        "operations": ["validate", "isSupported", "getSupportedYieldIds"],
        "maxInputBytes": MAX_INPUT_BYTES,
        "requiredFields": {
            "validate": ["yieldId", "unsignedTransaction", "userAddress"],
            "isSupported": ["yieldId"],
            "getSupportedYieldIds": [],
        },
    })
}
