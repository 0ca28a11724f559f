//! End-to-end scenarios and testable properties (spec.md §8).

use alloy_primitives::{Address, U256, address};
use alloy_sol_types::{SolCall, sol};
use solana_message::compiled_instruction::CompiledInstruction;
use solana_message::{Hash, Message, MessageHeader, VersionedMessage};
use solana_pubkey::Pubkey;
use solana_transaction::versioned::VersionedTransaction;
use std::str::FromStr;

use txguard::envelope::handle_json_request;
use txguard::registry::Registry;

const LIDO_YIELD_ID: &str = "ethereum-eth-lido-staking";
const SOLANA_YIELD_ID: &str = "solana-sol-native-multivalidator-staking";
const TRON_YIELD_ID: &str = "tron-trx-native-staking";
const USER: &str = "0x742d35cc6634c0532925a3b844bc9e7595f0beb8";
const REFERRAL: Address = address!("371240e80bf84ec2ba8b55ae2fd0b467b16db2be");
const STETH: &str = "0xae7ab96520de3a18e5e111b5eaab095312d7fe84";

sol! {
    function submit(address referral) external payable returns (uint256);
}

fn lido_stake_tx(extra_bytes: &[u8]) -> String {
    let call = submitCall { referral: REFERRAL };
    let mut data = call.abi_encode();
    data.extend_from_slice(extra_bytes);
    serde_json::json!({
        "to": STETH,
        "from": USER,
        "value": "0xde0b6b3a7640000",
        "data": format!("0x{}", hex::encode(data)),
        "chainId": 1,
    })
    .to_string()
}

fn validate_request(yield_id: &str, tx: &str, user: &str) -> String {
    serde_json::json!({
        "apiVersion": "1.0",
        "operation": "validate",
        "yieldId": yield_id,
        "unsignedTransaction": tx,
        "userAddress": user,
    })
    .to_string()
}

#[test]
fn e1_lido_stake_happy_path() {
    let registry = Registry::build().unwrap();
    let tx = lido_stake_tx(&[]);
    let request = validate_request(LIDO_YIELD_ID, &tx, USER);
    let response = handle_json_request(&registry, &request);
    let json = serde_json::to_value(&response).unwrap();
    assert!(json["ok"].as_bool().unwrap());
    assert!(json["result"]["isValid"].as_bool().unwrap());
    assert_eq!(json["result"]["detectedType"].as_str().unwrap(), "STAKE");
}

#[test]
fn e2_lido_tampered_stake() {
    let registry = Registry::build().unwrap();
    let tx = lido_stake_tx(b"\xde\xad\xbe\xef");
    let request = validate_request(LIDO_YIELD_ID, &tx, USER);
    let response = handle_json_request(&registry, &request);
    let json = serde_json::to_value(&response).unwrap();
    assert!(json["ok"].as_bool().unwrap());
    assert!(!json["result"]["isValid"].as_bool().unwrap());
    let attempts = json["result"]["details"]["attempts"].as_array().unwrap();
    let stake_attempt = attempts.iter().find(|a| a["type"] == "STAKE").unwrap();
    assert!(stake_attempt["reason"].as_str().unwrap().contains("calldata has been tampered"));
}

#[test]
fn e3_get_supported_yield_ids() {
    let registry = Registry::build().unwrap();
    let request = r#"{"apiVersion":"1.0","operation":"getSupportedYieldIds"}"#;
    let response = handle_json_request(&registry, request);
    let json = serde_json::to_value(&response).unwrap();
    assert!(json["ok"].as_bool().unwrap());
    let ids: Vec<&str> = json["result"]["yieldIds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(ids.contains(&LIDO_YIELD_ID));
    assert!(ids.contains(&SOLANA_YIELD_ID));
    assert!(ids.contains(&TRON_YIELD_ID));
}

sol! {
    function approve(address spender, uint256 amount) external returns (bool);
}

#[test]
fn e4_erc4626_approval_to_non_whitelisted_spender() {
    let registry = Registry::build().unwrap();
    let call = approveCall {
        spender: address!("000000000000000000000000000000000000bad1"),
        amount: U256::from(1000u64),
    };
    let tx = serde_json::json!({
        "to": "0xaf88d065e77c8cc2239327c5edb3a432268e5831",
        "data": format!("0x{}", hex::encode(call.abi_encode())),
        "chainId": 42161,
    })
    .to_string();
    let request = validate_request("arbitrum-usdc-euler-vault", &tx, USER);
    let response = handle_json_request(&registry, &request);
    let json = serde_json::to_value(&response).unwrap();
    assert!(!json["result"]["isValid"].as_bool().unwrap());
    let attempts = json["result"]["details"]["attempts"].as_array().unwrap();
    let approval = attempts.iter().find(|a| a["type"] == "APPROVAL").unwrap();
    assert!(approval["reason"].as_str().unwrap().contains("not a whitelisted vault"));
}

fn build_solana_tx(
    account_keys: Vec<Pubkey>,
    num_required_signatures: u8,
    num_readonly_signed: u8,
    num_readonly_unsigned: u8,
    instructions: Vec<CompiledInstruction>,
) -> String {
    let message = Message {
        header: MessageHeader {
            num_required_signatures,
            num_readonly_signed_accounts: num_readonly_signed,
            num_readonly_unsigned_accounts: num_readonly_unsigned,
        },
        account_keys,
        recent_blockhash: Hash::default(),
        instructions,
    };
    let tx = VersionedTransaction {
        signatures: vec![solana_signature::Signature::default(); num_required_signatures as usize],
        message: VersionedMessage::Legacy(message),
    };
    hex::encode(bincode::serialize(&tx).unwrap())
}

#[test]
fn e5_solana_stake_missing_initialize() {
    let registry = Registry::build().unwrap();
    let user = Pubkey::new_unique();
    let new_stake = Pubkey::new_unique();
    let compute_budget = Pubkey::from_str("ComputeBudget111111111111111111111111111111").unwrap();
    let system_program = Pubkey::from_str("11111111111111111111111111111111").unwrap();
    let stake_program = Pubkey::from_str("Stake11111111111111111111111111111111111111").unwrap();
    let account_keys = vec![user, new_stake, compute_budget, system_program, stake_program];

    let cu_limit = CompiledInstruction { program_id_index: 2, accounts: vec![], data: vec![2] };
    let cu_price = CompiledInstruction { program_id_index: 2, accounts: vec![], data: vec![3] };
    let create = CompiledInstruction {
        program_id_index: 3,
        accounts: vec![0, 1],
        data: vec![3, 0, 0, 0, 0, 0, 0, 0, 0],
    };
    let delegate = CompiledInstruction {
        program_id_index: 4,
        accounts: vec![1, 0, 0, 0, 0, 0],
        data: vec![2, 0, 0, 0],
    };

    let raw = build_solana_tx(account_keys, 1, 0, 4, vec![cu_limit, cu_price, create, delegate]);
    let request = validate_request(SOLANA_YIELD_ID, &raw, &user.to_string());
    let response = handle_json_request(&registry, &request);
    let json = serde_json::to_value(&response).unwrap();
    assert!(!json["result"]["isValid"].as_bool().unwrap());
    assert!(json["result"]["reason"]
        .as_str()
        .unwrap()
        .contains("No matching operation pattern found"));
}

#[test]
fn e6_tron_vote_wrong_owner() {
    let registry = Registry::build().unwrap();
    let owner_hex = "41aabbccddeeff00112233445566778899aabbccdd";
    let other_user_hex = "41112233445566778899aabbccddeeff001122334";
    let other_user_base58 = txguard::chain::tron::hex_to_base58(other_user_hex).unwrap();

    let tx = serde_json::json!({
        "raw_data": {
            "contract": [{
                "type": "VoteWitnessContract",
                "parameter": {
                    "value": {
                        "owner_address": owner_hex,
                        "votes": [
                            {"vote_address": "41332233445566778899aabbccddeeff00112233", "vote_count": 5.0}
                        ]
                    }
                }
            }]
        }
    })
    .to_string();

    let request = validate_request(TRON_YIELD_ID, &tx, &other_user_base58);
    let response = handle_json_request(&registry, &request);
    let json = serde_json::to_value(&response).unwrap();
    assert!(!json["result"]["isValid"].as_bool().unwrap());
    let attempts = json["result"]["details"]["attempts"].as_array().unwrap();
    let vote_attempt = attempts.iter().find(|a| a["type"] == "VOTE").unwrap();
    assert!(vote_attempt["reason"].as_str().unwrap().contains("does not match user address"));
}

#[test]
fn property_determinism_same_input_same_output() {
    let registry = Registry::build().unwrap();
    let tx = lido_stake_tx(&[]);
    let request = validate_request(LIDO_YIELD_ID, &tx, USER);
    let r1 = serde_json::to_string(&handle_json_request(&registry, &request)).unwrap();
    let r2 = serde_json::to_string(&handle_json_request(&registry, &request)).unwrap();
    assert_eq!(r1, r2);
}

#[test]
fn property_envelope_closure_rejects_unknown_fields() {
    let registry = Registry::build().unwrap();
    let request = r#"{"apiVersion":"1.0","operation":"getSupportedYieldIds","__proto__":{}}"#;
    let response = handle_json_request(&registry, request);
    let json = serde_json::to_value(&response).unwrap();
    assert!(!json["ok"].as_bool().unwrap());
    assert_eq!(json["error"]["code"].as_str().unwrap(), "SCHEMA_VALIDATION_ERROR");
}

#[test]
fn property_size_cap_rejects_oversized_input() {
    let registry = Registry::build().unwrap();
    let oversized = "a".repeat(txguard::envelope::MAX_INPUT_BYTES + 1);
    let response = handle_json_request(&registry, &oversized);
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["error"]["code"].as_str().unwrap(), "SCHEMA_VALIDATION_ERROR");
    assert!(json["error"]["message"].as_str().unwrap().contains("exceeds maximum size"));
}

#[test]
fn property_user_address_binding_rejects_wrong_owner() {
    let registry = Registry::build().unwrap();
    let tx = lido_stake_tx(&[]);
    let request = validate_request(LIDO_YIELD_ID, &tx, "0x0000000000000000000000000000000000dead");
    let response = handle_json_request(&registry, &request);
    let json = serde_json::to_value(&response).unwrap();
    assert!(!json["result"]["isValid"].as_bool().unwrap());
}

#[test]
fn property_chain_binding_rejects_wrong_chain_id() {
    let registry = Registry::build().unwrap();
    let call = submitCall { referral: REFERRAL };
    let tx = serde_json::json!({
        "to": STETH,
        "from": USER,
        "value": "0xde0b6b3a7640000",
        "data": format!("0x{}", hex::encode(call.abi_encode())),
        "chainId": 5,
    })
    .to_string();
    let request = validate_request(LIDO_YIELD_ID, &tx, USER);
    let response = handle_json_request(&registry, &request);
    let json = serde_json::to_value(&response).unwrap();
    assert!(!json["result"]["isValid"].as_bool().unwrap());
}

#[test]
fn property_weth_gating_rejects_wrap_on_non_weth_vault() {
    use txguard::chain::DecodedTx;
    use txguard::types::{OperationKind, ValidationArgs, ValidationContext};

    let registry = Registry::build().unwrap();
    let validator = registry.get("arbitrum-usdc-euler-vault").unwrap();
    let tx = serde_json::json!({
        "to": "0x1111111111111111111111111111111111111a01",
        "value": "0xde0b6b3a7640000",
        "data": "0xd0e30db0",
        "chainId": 42161,
    })
    .to_string();
    let decoded = DecodedTx::decode(validator.chain_family(), &tx).unwrap();
    let err = validator
        .validate(&decoded, OperationKind::Wrap, USER, &ValidationArgs::default(), &ValidationContext::default())
        .unwrap_err();
    assert!(err.reason.contains("No WETH vaults registered"));
}

#[test]
fn property_disabled_vault_rejects_withdraw() {
    let registry = Registry::build().unwrap();
    sol! {
        function withdraw(uint256 assets, address receiver, address owner) external returns (uint256 shares);
    }
    let user: Address = USER.parse().unwrap();
    let call = withdrawCall { assets: U256::from(1u64), receiver: user, owner: user };
    let tx = serde_json::json!({
        "to": "0x5555555555555555555555555555555555555e05",
        "data": format!("0x{}", hex::encode(call.abi_encode())),
        "chainId": 1,
    })
    .to_string();
    let request = validate_request("ethereum-usdc-yearn-vault", &tx, USER);
    let response = handle_json_request(&registry, &request);
    let json = serde_json::to_value(&response).unwrap();
    assert!(!json["result"]["isValid"].as_bool().unwrap());
    let attempts = json["result"]["details"]["attempts"].as_array().unwrap();
    let withdraw_attempt = attempts.iter().find(|a| a["type"] == "WITHDRAW").unwrap();
    assert!(withdraw_attempt["reason"].as_str().unwrap().contains("does not accept withdrawals"));
}
