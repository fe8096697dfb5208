// src/contracts/did_registry.rs
//! DID registry smart contract interfaces.
//!
//! One [`DidRegistry`] fronts the four registries (keys, names, service accounts,
//! account links) deployed on zkSync.

use crate::blockchain::zksync_client::ZkSyncClient;
use crate::config::ContractAddresses;
use crate::contracts::{abi, DidReader, DidWriter};
use crate::error::{DidError, Result};
use crate::models::records::{
    KeyRecord, KeyTuple, LinkedAccountRecord, LinkedAccountTuple, ServiceAccountRecord,
    ServiceAccountTuple,
};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256};
use log::{debug, info};

/// Registry client bound to the deployed contract addresses.
#[derive(Clone)]
pub struct DidRegistry {
    /// Underlying chain client
    client: ZkSyncClient,
    contracts: ContractAddresses,
}

impl DidRegistry {
    pub fn new(client: ZkSyncClient, contracts: ContractAddresses) -> Self {
        DidRegistry { client, contracts }
    }

    pub fn client(&self) -> &ZkSyncClient {
        &self.client
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }
}

/// Treats a zero address or a revert as "no entry", the registries' negative answers.
fn optional_subject(result: Result<Address>) -> Result<Option<Address>> {
    match result {
        Ok(subject) if subject.is_zero() => Ok(None),
        Ok(subject) => Ok(Some(subject)),
        Err(DidError::Reverted(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

#[async_trait]
impl DidReader for DidRegistry {
    async fn did_for_name(&self, name: &str) -> Result<Option<Address>> {
        debug!("getDidForName({name:?})");
        optional_subject(
            self.client
                .query_contract(
                    self.contracts.name_registry,
                    &abi::NAME_REGISTRY,
                    "getDidForName",
                    name.to_string(),
                )
                .await,
        )
    }

    async fn name_for_did(&self, subject: Address) -> Result<Option<String>> {
        let result: Result<String> = self
            .client
            .query_contract(
                self.contracts.name_registry,
                &abi::NAME_REGISTRY,
                "getNameForDid",
                subject,
            )
            .await;
        match result {
            Ok(name) if name.is_empty() => Ok(None),
            Ok(name) => Ok(Some(name)),
            Err(DidError::Reverted(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn did_by_linked_account(&self, account: Address) -> Result<Option<Address>> {
        debug!("getDidByLinkedAccount({account:?})");
        optional_subject(
            self.client
                .query_contract(
                    self.contracts.account_link_registry,
                    &abi::ACCOUNT_LINK_REGISTRY,
                    "getDidByLinkedAccount",
                    account,
                )
                .await,
        )
    }

    async fn did_exists(&self, subject: Address) -> Result<bool> {
        debug!("didExists({subject:?})");
        self.client
            .query_contract(self.contracts.key_registry, &abi::KEY_REGISTRY, "didExists", subject)
            .await
    }

    async fn keys(&self, subject: Address) -> Result<Vec<KeyRecord>> {
        let keys: Vec<KeyTuple> = self
            .client
            .query_contract(self.contracts.key_registry, &abi::KEY_REGISTRY, "getKeys", subject)
            .await?;
        Ok(keys.into_iter().map(KeyRecord::from).collect())
    }

    async fn service_accounts(&self, subject: Address) -> Result<Vec<ServiceAccountRecord>> {
        let accounts: Vec<ServiceAccountTuple> = self
            .client
            .query_contract(
                self.contracts.service_account_registry,
                &abi::SERVICE_ACCOUNT_REGISTRY,
                "getServiceAccounts",
                subject,
            )
            .await?;
        Ok(accounts.into_iter().map(ServiceAccountRecord::from).collect())
    }

    async fn linked_accounts(&self, subject: Address) -> Result<Vec<LinkedAccountRecord>> {
        let links: Vec<LinkedAccountTuple> = self
            .client
            .query_contract(
                self.contracts.account_link_registry,
                &abi::ACCOUNT_LINK_REGISTRY,
                "getLinkedAccounts",
                subject,
            )
            .await?;
        Ok(links.into_iter().map(LinkedAccountRecord::from).collect())
    }
}

#[async_trait]
impl DidWriter for DidRegistry {
    fn signer_address(&self) -> Option<Address> {
        self.client.signer_address()
    }

    async fn sign_link_consent(&self, subject: Address, purpose: &str) -> Result<Bytes> {
        let keys = self.client.keys().ok_or(DidError::NoSigner)?;
        let signature = keys.sign_link_consent(subject, purpose).await?;
        Ok(Bytes::from(signature.to_vec()))
    }

    async fn register_did(&self, keys: Vec<KeyTuple>) -> Result<H256> {
        info!("registering DID with {} key(s)", keys.len());
        self.client
            .send_transaction(self.contracts.key_registry, &abi::KEY_REGISTRY, "registerDid", (keys,))
            .await
    }

    async fn add_key(&self, subject: Address, key: KeyTuple) -> Result<H256> {
        info!("adding key {:?} to {subject:?}", key.0);
        self.client
            .send_transaction(self.contracts.key_registry, &abi::KEY_REGISTRY, "addKey", (subject, key))
            .await
    }

    async fn remove_key(&self, subject: Address, key_id: &str) -> Result<H256> {
        info!("revoking key {key_id:?} of {subject:?}");
        self.client
            .send_transaction(
                self.contracts.key_registry,
                &abi::KEY_REGISTRY,
                "removeKey",
                (subject, key_id.to_string()),
            )
            .await
    }

    async fn register_service_account(
        &self,
        subject: Address,
        account: ServiceAccountRecord,
    ) -> Result<H256> {
        info!("adding service account {:?} to {subject:?}", account.id);
        let accounts: Vec<ServiceAccountTuple> = vec![account.into()];
        self.client
            .send_transaction(
                self.contracts.service_account_registry,
                &abi::SERVICE_ACCOUNT_REGISTRY,
                "registerServiceAccount",
                (subject, accounts),
            )
            .await
    }

    async fn remove_service_account(&self, subject: Address, id: &str) -> Result<H256> {
        info!("removing service account {id:?} of {subject:?}");
        self.client
            .send_transaction(
                self.contracts.service_account_registry,
                &abi::SERVICE_ACCOUNT_REGISTRY,
                "removeServiceAccount",
                (subject, id.to_string()),
            )
            .await
    }

    async fn register_linked_account(
        &self,
        subject: Address,
        link: LinkedAccountRecord,
    ) -> Result<H256> {
        info!("linking {:?} to {subject:?} as {:?}", link.account, link.id);
        self.client
            .send_transaction(
                self.contracts.account_link_registry,
                &abi::ACCOUNT_LINK_REGISTRY,
                "registerLinkedAccount",
                (subject, link.id, link.account, link.purpose, link.signature),
            )
            .await
    }

    async fn remove_linked_account(&self, subject: Address, id: &str) -> Result<H256> {
        info!("unlinking {id:?} from {subject:?}");
        self.client
            .send_transaction(
                self.contracts.account_link_registry,
                &abi::ACCOUNT_LINK_REGISTRY,
                "removeLinkedAccount",
                (subject, id.to_string()),
            )
            .await
    }

    async fn register_name(&self, subject: Address, name: &str) -> Result<H256> {
        info!("registering name {name:?} for {subject:?}");
        self.client
            .send_transaction(
                self.contracts.name_registry,
                &abi::NAME_REGISTRY,
                "registerName",
                (subject, name.to_string()),
            )
            .await
    }

    async fn unregister_name(&self, subject: Address) -> Result<H256> {
        info!("unregistering name of {subject:?}");
        self.client
            .send_transaction(self.contracts.name_registry, &abi::NAME_REGISTRY, "unregisterName", subject)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address_and_revert_are_negative_answers() {
        assert_eq!(optional_subject(Ok(Address::zero())).unwrap(), None);
        assert_eq!(
            optional_subject(Err(DidError::Reverted("0x".into()))).unwrap(),
            None
        );
        assert_eq!(
            optional_subject(Ok(Address::repeat_byte(1))).unwrap(),
            Some(Address::repeat_byte(1))
        );
        assert!(optional_subject(Err(DidError::Provider("timeout".into()))).is_err());
    }
}
