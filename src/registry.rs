//! Immutable yield_id -> validator registry (spec.md §5, §6).
//!
//! Construction order mirrors the teacher's scheme registry construction in
//! `scheme/mod.rs`: hard-coded entries first, then the embedded vault
//! registry is loaded and one [`validators::erc4626::Erc4626Validator`] is
//! built per vault whose protocol is in the allowed set. Everything here is
//! read-only after [`Registry::build`] returns.

use std::collections::HashMap;

use serde::Deserialize;

use crate::validators::erc4626::{Erc4626Validator, VaultInfo};
use crate::validators::lido::LidoValidator;
use crate::validators::solana_stake::SolanaStakeValidator;
use crate::validators::tron_stake::TronStakeValidator;
use crate::validators::AnyValidator;

const EMBEDDED_VAULT_REGISTRY: &str = include_str!("../data/vault_registry.json");

const LIDO_YIELD_ID: &str = "ethereum-eth-lido-staking";
const SOLANA_YIELD_ID: &str = "solana-sol-native-multivalidator-staking";
const TRON_YIELD_ID: &str = "tron-trx-native-staking";

/// Protocols this deployment permits ERC-4626 validators for (spec.md §5).
const ALLOWED_PROTOCOLS: &[&str] = &[
    "angle",
    "curve",
    "euler",
    "fluid",
    "gearbox",
    "idle-finance",
    "lista",
    "morpho",
    "sky",
    "summer-fi",
    "venus-flux",
    "yearn",
    "yo-protocol",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VaultRegistryFile {
    #[allow(dead_code)]
    version: u32,
    #[allow(dead_code)]
    generated_at: String,
    vaults: Vec<VaultInfo>,
}

/// Failure to build the registry from the embedded vault file.
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("embedded vault registry is not valid JSON: {0}")]
    MalformedVaultRegistry(#[from] serde_json::Error),
    #[error("duplicate yield id in registry: {0}")]
    DuplicateYieldId(String),
}

/// The immutable mapping of yield id to validator.
#[derive(Debug, Clone)]
pub struct Registry {
    validators: HashMap<String, AnyValidator>,
}

impl Registry {
    /// Builds the registry: hard-coded entries, then one ERC-4626 validator
    /// per allowed-protocol vault in the embedded registry file.
    pub fn build() -> Result<Self, RegistryError> {
        Self::build_from_vault_json(EMBEDDED_VAULT_REGISTRY)
    }

    /// Builds the registry from an externally supplied vault registry file,
    /// for deployments that refresh vault data out of band (SPEC_FULL.md §3.3).
    pub fn build_from_vault_json(vault_json: &str) -> Result<Self, RegistryError> {
        let mut validators = HashMap::new();
        validators.insert(LIDO_YIELD_ID.to_string(), AnyValidator::Lido(LidoValidator));
        validators.insert(
            SOLANA_YIELD_ID.to_string(),
            AnyValidator::SolanaStake(SolanaStakeValidator),
        );
        validators.insert(TRON_YIELD_ID.to_string(), AnyValidator::TronStake(TronStakeValidator));

        let file: VaultRegistryFile = serde_json::from_str(vault_json)?;
        for vault in file.vaults {
            if !ALLOWED_PROTOCOLS.contains(&vault.protocol.as_str()) {
                continue;
            }
            let yield_id = vault.yield_id.clone();
            let normalized = normalize_vault(vault);
            if validators
                .insert(yield_id.clone(), AnyValidator::Erc4626(Erc4626Validator::new(normalized)))
                .is_some()
            {
                return Err(RegistryError::DuplicateYieldId(yield_id));
            }
        }

        Ok(Self { validators })
    }

    pub fn get(&self, yield_id: &str) -> Option<&AnyValidator> {
        self.validators.get(yield_id)
    }

    pub fn contains(&self, yield_id: &str) -> bool {
        self.validators.contains_key(yield_id)
    }

    pub fn yield_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.validators.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn normalize_vault(mut vault: VaultInfo) -> VaultInfo {
    vault.address = vault.address.to_lowercase();
    vault.input_token_address = vault.input_token_address.to_lowercase();
    vault.vault_token_address = vault.vault_token_address.to_lowercase();
    vault.allocator_vaults = vault.allocator_vaults.iter().map(|a| a.to_lowercase()).collect();
    vault
}
