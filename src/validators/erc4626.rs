//! Parametric ERC-4626 vault validator (spec.md §4.4).
//!
//! One [`Erc4626Validator`] is constructed per registered vault (see
//! [`crate::registry`]); `allocator_vaults` is treated as authoritative per
//! the Open Questions in spec.md §9 — those addresses are accepted
//! wherever the vault's own address would be, for SUPPLY, WITHDRAW, and
//! APPROVAL.

use std::collections::HashMap;

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::chain::DecodedTx;
use crate::chain::evm::{EvmTransaction, address_matches, decode_call};
use crate::error::ValidatorError;
use crate::types::{OperationKind, ValidationArgs, ValidationContext};

/// WETH address per chain id, lower-case (spec.md §6).
static WETH_BY_CHAIN: Lazy<HashMap<u64, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (1, "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
        (10, "0x4200000000000000000000000000000000000006"),
        (56, "0x2170ed0880ac9a755fd29b2688956bd959f933f8"),
        (100, "0x6a023ccd1ff6f2045c3309768ead9e68f978f6e1"),
        (130, "0x4200000000000000000000000000000000000006"),
        (137, "0x7ceb23fd6bc0add59e62ac25578270cff1b9f619"),
        (146, "0x50c42deacd8fc9773493ed674b675be577f2634b"),
        (8453, "0x4200000000000000000000000000000000000006"),
        (42161, "0x82af49447d8a07e3bd95bd0d56f35241523fbab1"),
        (43114, "0x49d5c2bdffac6ce2bfdb6640f4f80f226bc10bab"),
    ])
});

/// One entry from the embedded vault registry (spec.md §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultInfo {
    pub address: String,
    pub chain_id: u64,
    pub protocol: String,
    pub yield_id: String,
    pub input_token_address: String,
    pub vault_token_address: String,
    pub network: String,
    pub is_weth_vault: bool,
    pub can_enter: bool,
    pub can_exit: bool,
    #[serde(default)]
    pub allocator_vaults: Vec<String>,
}

impl VaultInfo {
    fn accepted_addresses(&self) -> Vec<&str> {
        let mut addrs = vec![self.address.as_str()];
        addrs.extend(self.allocator_vaults.iter().map(String::as_str));
        addrs
    }
}

alloy_sol_types::sol! {
    function approve(address spender, uint256 amount) external returns (bool);
    function deposit(uint256 assets, address receiver) external returns (uint256 shares);
    function mint(uint256 shares, address receiver) external returns (uint256 assets);
    function withdraw(uint256 assets, address receiver, address owner) external returns (uint256 shares);
    function redeem(uint256 shares, address receiver, address owner) external returns (uint256 assets);
}

mod weth {
    alloy_sol_types::sol! {
        function deposit() external payable;
        function withdraw(uint256 wad) external;
    }
}

/// Validates approval/wrap/supply/withdraw/unwrap transactions against one registered vault.
#[derive(Debug, Clone)]
pub struct Erc4626Validator {
    vault: VaultInfo,
    supported_ops: Vec<OperationKind>,
}

impl Erc4626Validator {
    pub fn new(vault: VaultInfo) -> Self {
        let mut supported_ops = vec![OperationKind::Approval, OperationKind::Supply, OperationKind::Withdraw];
        if vault.is_weth_vault {
            supported_ops.push(OperationKind::Wrap);
            supported_ops.push(OperationKind::Unwrap);
        }
        Self { vault, supported_ops }
    }

    pub fn vault(&self) -> &VaultInfo {
        &self.vault
    }

    pub fn supported_ops(&self) -> &[OperationKind] {
        &self.supported_ops
    }

    pub fn validate(
        &self,
        tx: &DecodedTx,
        op: OperationKind,
        user_address: &str,
        _args: &ValidationArgs,
        ctx: &ValidationContext,
    ) -> Result<(), ValidatorError> {
        let evm = tx
            .as_evm()
            .ok_or_else(|| ValidatorError::new("expected an EVM transaction"))?;
        if evm.chain_id != self.vault.chain_id {
            return Err(ValidatorError::new("vault is not registered on this chain"));
        }
        match op {
            OperationKind::Approval => self.validate_approval(evm, ctx),
            OperationKind::Supply => self.validate_supply(evm, user_address, ctx),
            OperationKind::Withdraw => self.validate_withdraw(evm, user_address, ctx),
            OperationKind::Wrap => self.validate_wrap(evm),
            OperationKind::Unwrap => self.validate_unwrap(evm),
            _ => Err(ValidatorError::new("operation not supported by this validator")),
        }
    }

    fn accepted_spenders(&self) -> Vec<String> {
        self.vault
            .accepted_addresses()
            .into_iter()
            .map(str::to_lowercase)
            .collect()
    }

    fn validate_approval(&self, evm: &EvmTransaction, _ctx: &ValidationContext) -> Result<(), ValidatorError> {
        if evm.value != U256::ZERO {
            return Err(ValidatorError::new("approval transactions must not carry ETH value"));
        }
        if !evm.to_matches(&self.vault.input_token_address) {
            return Err(ValidatorError::new("transaction recipient is not the vault's input token"));
        }
        let call = decode_call::<approveCall>(&evm.data)?;
        let spender = format!("{:#x}", call.spender).to_lowercase();
        if !self.accepted_spenders().iter().any(|a| *a == spender) {
            return Err(ValidatorError::new("spender is not a whitelisted vault"));
        }
        if call.amount.is_zero() {
            return Err(ValidatorError::new("approval amount must not be zero"));
        }
        Ok(())
    }

    fn validate_supply(&self, evm: &EvmTransaction, user: &str, _ctx: &ValidationContext) -> Result<(), ValidatorError> {
        if !self.can_enter() {
            return Err(ValidatorError::new("vault does not accept deposits"));
        }
        if evm.value != U256::ZERO {
            return Err(ValidatorError::new("supply transactions must not carry ETH value"));
        }
        let accepted = self.accepted_spenders();
        if !accepted.iter().any(|a| evm.to_matches(a)) {
            return Err(ValidatorError::new("transaction recipient is not a registered vault"));
        }
        let selector: Option<[u8; 4]> = evm.data.get(0..4).and_then(|s| s.try_into().ok());
        let (amount_zero, receiver) = if selector == Some(depositCall::SELECTOR) {
            let call = decode_call::<depositCall>(&evm.data)?;
            (call.assets.is_zero(), call.receiver)
        } else if selector == Some(mintCall::SELECTOR) {
            let call = decode_call::<mintCall>(&evm.data)?;
            (call.shares.is_zero(), call.receiver)
        } else {
            return Err(ValidatorError::new("calldata does not match a known supply method"));
        };
        if amount_zero {
            return Err(ValidatorError::new("supply amount must not be zero"));
        }
        if !address_matches(receiver, user) {
            return Err(ValidatorError::new("receiver does not match user address"));
        }
        Ok(())
    }

    fn validate_withdraw(&self, evm: &EvmTransaction, user: &str, _ctx: &ValidationContext) -> Result<(), ValidatorError> {
        if !self.can_exit() {
            return Err(ValidatorError::new("vault does not accept withdrawals"));
        }
        if evm.value != U256::ZERO {
            return Err(ValidatorError::new("withdraw transactions must not carry ETH value"));
        }
        let accepted = self.accepted_spenders();
        if !accepted.iter().any(|a| evm.to_matches(a)) {
            return Err(ValidatorError::new("transaction recipient is not a registered vault"));
        }
        let selector: Option<[u8; 4]> = evm.data.get(0..4).and_then(|s| s.try_into().ok());
        let (amount_zero, receiver, owner) = if selector == Some(withdrawCall::SELECTOR) {
            let call = decode_call::<withdrawCall>(&evm.data)?;
            (call.assets.is_zero(), call.receiver, call.owner)
        } else if selector == Some(redeemCall::SELECTOR) {
            let call = decode_call::<redeemCall>(&evm.data)?;
            (call.shares.is_zero(), call.receiver, call.owner)
        } else {
            return Err(ValidatorError::new("calldata does not match a known withdraw method"));
        };
        if amount_zero {
            return Err(ValidatorError::new("withdraw amount must not be zero"));
        }
        if !address_matches(receiver, user) {
            return Err(ValidatorError::new("receiver does not match user address"));
        }
        if !address_matches(owner, user) {
            return Err(ValidatorError::new("owner does not match user address"));
        }
        Ok(())
    }

    fn validate_wrap(&self, evm: &EvmTransaction) -> Result<(), ValidatorError> {
        if !self.vault.is_weth_vault {
            return Err(ValidatorError::new("No WETH vaults registered for this validator"));
        }
        let weth = WETH_BY_CHAIN
            .get(&evm.chain_id)
            .ok_or_else(|| ValidatorError::new("WETH not configured for this chain"))?;
        if !evm.to_matches(weth) {
            return Err(ValidatorError::new("transaction recipient is not the WETH contract"));
        }
        decode_call::<weth::depositCall>(&evm.data)?;
        if evm.value == U256::ZERO {
            return Err(ValidatorError::new("wrap transactions must carry a positive ETH value"));
        }
        Ok(())
    }

    fn validate_unwrap(&self, evm: &EvmTransaction) -> Result<(), ValidatorError> {
        if !self.vault.is_weth_vault {
            return Err(ValidatorError::new("No WETH vaults registered for this validator"));
        }
        let weth = WETH_BY_CHAIN
            .get(&evm.chain_id)
            .ok_or_else(|| ValidatorError::new("WETH not configured for this chain"))?;
        if !evm.to_matches(weth) {
            return Err(ValidatorError::new("transaction recipient is not the WETH contract"));
        }
        if evm.value != U256::ZERO {
            return Err(ValidatorError::new("unwrap transactions must not carry ETH value"));
        }
        let call = decode_call::<weth::withdrawCall>(&evm.data)?;
        if call.wad.is_zero() {
            return Err(ValidatorError::new("unwrap amount must not be zero"));
        }
        Ok(())
    }

    fn can_enter(&self) -> bool {
        self.vault.can_enter
    }

    fn can_exit(&self) -> bool {
        self.vault.can_exit
    }
}
