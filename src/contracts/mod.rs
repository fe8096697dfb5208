// src/contracts/mod.rs
//! Interfaces of the external registries.
//!
//! The traits describe what the crate consumes from the chain; [`did_registry`] and
//! [`token`] implement them over [`crate::blockchain::zksync_client::ZkSyncClient`].
//! Tests substitute in-memory implementations.

pub mod abi;
pub mod did_registry;
pub mod token;

use crate::error::Result;
use crate::models::records::{
    KeyRecord, KeyTuple, LinkedAccountRecord, ServiceAccountRecord,
};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

pub use did_registry::DidRegistry;

/// Read operations on the key, name, service-account and account-link registries.
#[async_trait]
pub trait DidReader: Send + Sync {
    /// Subject registered under `name`; `None` when the name is free.
    async fn did_for_name(&self, name: &str) -> Result<Option<Address>>;

    /// Name registered for `subject`; `None` when it has none.
    async fn name_for_did(&self, subject: Address) -> Result<Option<String>>;

    /// Subject that linked `account`; `None` when the account is not linked.
    async fn did_by_linked_account(&self, account: Address) -> Result<Option<Address>>;

    async fn did_exists(&self, subject: Address) -> Result<bool>;

    async fn keys(&self, subject: Address) -> Result<Vec<KeyRecord>>;

    async fn service_accounts(&self, subject: Address) -> Result<Vec<ServiceAccountRecord>>;

    async fn linked_accounts(&self, subject: Address) -> Result<Vec<LinkedAccountRecord>>;
}

/// Transactions against the registries, signed by the connected wallet.
///
/// Every method waits for the receipt and returns the transaction hash.
#[async_trait]
pub trait DidWriter: Send + Sync {
    /// Connected wallet, `None` for a read-only client.
    fn signer_address(&self) -> Option<Address>;

    /// Connected wallet's consent to be linked to `subject` for `purpose`.
    async fn sign_link_consent(&self, subject: Address, purpose: &str) -> Result<Bytes>;

    async fn register_did(&self, keys: Vec<KeyTuple>) -> Result<H256>;

    async fn add_key(&self, subject: Address, key: KeyTuple) -> Result<H256>;

    async fn remove_key(&self, subject: Address, key_id: &str) -> Result<H256>;

    async fn register_service_account(
        &self,
        subject: Address,
        account: ServiceAccountRecord,
    ) -> Result<H256>;

    async fn remove_service_account(&self, subject: Address, id: &str) -> Result<H256>;

    async fn register_linked_account(
        &self,
        subject: Address,
        link: LinkedAccountRecord,
    ) -> Result<H256>;

    async fn remove_linked_account(&self, subject: Address, id: &str) -> Result<H256>;

    async fn register_name(&self, subject: Address, name: &str) -> Result<H256>;

    async fn unregister_name(&self, subject: Address) -> Result<H256>;
}

/// ERC-20 payment token and its faucet.
#[async_trait]
pub trait PaymentToken: Send + Sync {
    async fn token_balance(&self, owner: Address) -> Result<U256>;

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256>;

    async fn approve(&self, spender: Address, amount: U256) -> Result<H256>;

    async fn transfer(&self, to: Address, amount: U256) -> Result<H256>;

    /// Asks the faucet for free tokens for the connected wallet.
    async fn request_tokens(&self) -> Result<H256>;
}

/// Everything the API server needs from the chain.
pub trait Registry: DidReader + DidWriter + PaymentToken + 'static {}

impl<T: DidReader + DidWriter + PaymentToken + 'static> Registry for T {}
