// src/contracts/token.rs
//! Payment token (ERC-20) and faucet calls.

use crate::contracts::{abi, DidRegistry, PaymentToken};
use crate::error::Result;
use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use log::info;

#[async_trait]
impl PaymentToken for DidRegistry {
    async fn token_balance(&self, owner: Address) -> Result<U256> {
        self.client()
            .query_contract(self.contracts().token, &abi::ERC20, "balanceOf", owner)
            .await
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        self.client()
            .query_contract(self.contracts().token, &abi::ERC20, "allowance", (owner, spender))
            .await
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<H256> {
        info!("approving {spender:?} to pull {amount}");
        self.client()
            .send_transaction(self.contracts().token, &abi::ERC20, "approve", (spender, amount))
            .await
    }

    async fn transfer(&self, to: Address, amount: U256) -> Result<H256> {
        info!("sending {amount} to {to:?}");
        self.client()
            .send_transaction(self.contracts().token, &abi::ERC20, "transfer", (to, amount))
            .await
    }

    async fn request_tokens(&self) -> Result<H256> {
        info!("requesting faucet tokens");
        self.client()
            .send_transaction(self.contracts().faucet, &abi::FAUCET, "requestTokens", ())
            .await
    }
}
