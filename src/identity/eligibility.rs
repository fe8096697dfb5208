// src/identity/eligibility.rs
//! Whether the connected wallet can self-register a DID, and what it must do first.

use crate::identity::lookup::Lookup;
use ethers::types::{Address, U256};
use serde::Serialize;

/// Externally fetched facts the decision is made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInputs {
    pub connected: Option<Address>,
    /// Key registry's `didExists` for the connected address
    pub did_exists: Lookup<bool>,
    /// Payment token balance of the connected address
    pub balance: Lookup<U256>,
    /// Allowance the connected address granted the key registry
    pub allowance: Lookup<U256>,
    /// Amount the key registry pulls on registration
    pub required: U256,
}

/// Next action offered to the connected wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    ConnectWallet,
    /// A deciding read has not answered, or failed
    Checking,
    AlreadyRegistered,
    /// Balance below the registration fee; use the faucet
    RequestTokens,
    /// Tokens are there but the registry may not pull them yet
    ApproveAllowance,
    Register,
}

pub fn registration_step(inputs: &RegistrationInputs) -> RegistrationStep {
    if inputs.connected.is_none() {
        return RegistrationStep::ConnectWallet;
    }
    match inputs.did_exists.found() {
        None => return RegistrationStep::Checking,
        Some(true) => return RegistrationStep::AlreadyRegistered,
        Some(false) => {}
    }
    match inputs.balance.found() {
        None => return RegistrationStep::Checking,
        Some(balance) if *balance < inputs.required => return RegistrationStep::RequestTokens,
        Some(_) => {}
    }
    match inputs.allowance.found() {
        None => RegistrationStep::Checking,
        Some(allowance) if *allowance < inputs.required => RegistrationStep::ApproveAllowance,
        Some(_) => RegistrationStep::Register,
    }
}
