// src/services/registrar.rs
//! Write side of the DID registries.
//!
//! Every record change is checked against a fresh key fetch first: the signing
//! wallet must hold an authentication key on the DID it is about to modify.

use crate::config::ContractAddresses;
use crate::contracts::{DidReader, DidWriter, PaymentToken};
use crate::error::{DidError, Result};
use crate::identity::has_write_access;
use crate::models::did::Did;
use crate::models::records::{LinkedAccountRecord, NewKey, ServiceAccountRecord};
use crate::wallet::key_management::verify_link_consent;
use ethers::types::{Address, Bytes, H256, U256};
use log::{info, warn};
use serde::Deserialize;
use std::sync::Arc;

/// Request to link an account to a DID.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkRequest {
    pub id: String,
    pub account: Address,
    pub purpose: String,
    /// Consent signed by `account`; may be omitted when `account` is the signer
    #[serde(default)]
    pub signature: Option<Bytes>,
}

/// Submits registry and token transactions on behalf of the signing wallet.
pub struct Registrar<R> {
    registry: Arc<R>,
    contracts: ContractAddresses,
}

impl<R: DidReader + DidWriter + PaymentToken> Registrar<R> {
    pub fn new(registry: Arc<R>, contracts: ContractAddresses) -> Self {
        Registrar { registry, contracts }
    }

    fn signer(&self) -> Result<Address> {
        self.registry.signer_address().ok_or(DidError::NoSigner)
    }

    /// Resolves `did` to its subject, refusing when the signer cannot modify it.
    async fn authorize(&self, did: &Did) -> Result<Address> {
        let subject = did.subject()?;
        let signer = self.signer()?;
        let keys = self.registry.keys(subject).await?;
        if !has_write_access(&keys, Some(signer)) {
            warn!("{signer:?} holds no auth key on {did}");
            return Err(DidError::Forbidden(did.to_string()));
        }
        Ok(subject)
    }

    /// Registers the signer's own DID with its default authentication key.
    ///
    /// # Errors
    /// [`DidError::Validation`] when the signer already has a DID.
    pub async fn register(&self) -> Result<H256> {
        let signer = self.signer()?;
        if self.registry.did_exists(signer).await? {
            return Err(DidError::Validation(format!(
                "{} is already registered",
                Did::for_subject(signer)
            )));
        }
        let key = NewKey::default_for(signer).into_tuple()?;
        self.registry.register_did(vec![key]).await
    }

    pub async fn add_key(&self, did: &Did, key: NewKey) -> Result<H256> {
        let key = key.into_tuple()?;
        let subject = self.authorize(did).await?;
        self.registry.add_key(subject, key).await
    }

    pub async fn remove_key(&self, did: &Did, key_id: &str) -> Result<H256> {
        require_id("key", key_id)?;
        let subject = self.authorize(did).await?;
        self.registry.remove_key(subject, key_id).await
    }

    pub async fn add_service_account(
        &self,
        did: &Did,
        account: ServiceAccountRecord,
    ) -> Result<H256> {
        account.validate()?;
        let subject = self.authorize(did).await?;
        self.registry.register_service_account(subject, account).await
    }

    pub async fn remove_service_account(&self, did: &Did, id: &str) -> Result<H256> {
        require_id("service account", id)?;
        let subject = self.authorize(did).await?;
        self.registry.remove_service_account(subject, id).await
    }

    /// Links `request.account` to `did`.
    ///
    /// A supplied signature must be the account's consent for this subject and purpose.
    /// Without one, the signer can only link itself and signs the consent on the spot.
    pub async fn link_account(&self, did: &Did, request: LinkRequest) -> Result<H256> {
        require_id("linked account", &request.id)?;
        if request.purpose.trim().is_empty() {
            return Err(DidError::Validation("purpose must not be empty".into()));
        }
        let subject = self.authorize(did).await?;

        let signature = match request.signature {
            Some(signature) => {
                verify_link_consent(subject, request.account, &request.purpose, &signature)?;
                signature
            }
            None if Some(request.account) == self.registry.signer_address() => {
                self.registry
                    .sign_link_consent(subject, &request.purpose)
                    .await?
            }
            None => {
                return Err(DidError::Validation(format!(
                    "consent signature from {:?} is required",
                    request.account
                )))
            }
        };

        let link = LinkedAccountRecord {
            id: request.id,
            account: request.account,
            purpose: request.purpose,
            signature,
        };
        self.registry.register_linked_account(subject, link).await
    }

    pub async fn unlink_account(&self, did: &Did, id: &str) -> Result<H256> {
        require_id("linked account", id)?;
        let subject = self.authorize(did).await?;
        self.registry.remove_linked_account(subject, id).await
    }

    pub async fn register_name(&self, did: &Did, name: &str) -> Result<H256> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DidError::Validation("name must not be empty".into()));
        }
        let subject = self.authorize(did).await?;
        self.registry.register_name(subject, name).await
    }

    pub async fn unregister_name(&self, did: &Did) -> Result<H256> {
        let subject = self.authorize(did).await?;
        self.registry.unregister_name(subject).await
    }

    /// Lets one of the registries pull `amount` payment tokens from the signer.
    ///
    /// # Errors
    /// [`DidError::Validation`] when `spender` is not a registry.
    pub async fn approve(&self, spender: Address, amount: U256) -> Result<H256> {
        if !self.contracts.spenders().contains(&spender) {
            return Err(DidError::Validation(format!("{spender:?} is not a registry")));
        }
        self.signer()?;
        self.registry.approve(spender, amount).await
    }

    pub async fn request_tokens(&self) -> Result<H256> {
        let signer = self.signer()?;
        info!("faucet request for {signer:?}");
        self.registry.request_tokens().await
    }

    pub async fn transfer(&self, to: Address, amount: U256) -> Result<H256> {
        if amount.is_zero() {
            return Err(DidError::Validation("amount must be positive".into()));
        }
        self.signer()?;
        self.registry.transfer(to, amount).await
    }
}

fn require_id(what: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(DidError::Validation(format!("{what} id must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::directory::tests::{alice, FakeRegistry};
    use crate::wallet::key_management::KeyManager;

    pub(crate) fn contracts() -> ContractAddresses {
        ContractAddresses {
            key_registry: Address::repeat_byte(0xa1),
            name_registry: Address::repeat_byte(0xa2),
            service_account_registry: Address::repeat_byte(0xa3),
            account_link_registry: Address::repeat_byte(0xa4),
            token: Address::repeat_byte(0xa5),
            faucet: Address::repeat_byte(0xa6),
        }
    }

    fn setup(registry: FakeRegistry) -> (Arc<FakeRegistry>, Registrar<FakeRegistry>) {
        let registry = Arc::new(registry);
        (registry.clone(), Registrar::new(registry, contracts()))
    }

    fn service() -> ServiceAccountRecord {
        ServiceAccountRecord {
            id: "inbox".into(),
            types: vec!["messaging".into()],
            endpoints: vec!["https://inbox.example".into()],
        }
    }

    #[tokio::test]
    async fn owner_can_modify_records() {
        let fake = FakeRegistry::default().with_key(alice(), alice()).with_signer(alice());
        let (registry, registrar) = setup(fake);
        let did = Did::for_subject(alice());

        registrar.add_service_account(&did, service()).await.unwrap();
        registrar.register_name(&did, " alice ").await.unwrap();
        registrar.remove_key(&did, "old").await.unwrap();

        assert_eq!(
            registry.sent(),
            vec![
                format!("registerServiceAccount({:?}, inbox)", alice()),
                format!("registerName({:?}, alice)", alice()),
                format!("removeKey({:?}, old)", alice()),
            ]
        );
    }

    #[tokio::test]
    async fn stranger_is_refused_before_sending() {
        let stranger = Address::repeat_byte(0x99);
        let fake = FakeRegistry::default().with_key(alice(), alice()).with_signer(stranger);
        let (registry, registrar) = setup(fake);

        let err = registrar
            .unregister_name(&Did::for_subject(alice()))
            .await
            .unwrap_err();
        assert!(matches!(err, DidError::Forbidden(_)));
        assert!(registry.sent().is_empty());
    }

    #[tokio::test]
    async fn invalid_payloads_are_rejected() {
        let fake = FakeRegistry::default().with_key(alice(), alice()).with_signer(alice());
        let (registry, registrar) = setup(fake);
        let did = Did::for_subject(alice());

        let mut bad = service();
        bad.endpoints.clear();
        assert!(matches!(
            registrar.add_service_account(&did, bad).await,
            Err(DidError::Validation(_))
        ));
        assert!(matches!(registrar.remove_key(&did, " ").await, Err(DidError::Validation(_))));
        assert!(matches!(
            registrar.transfer(alice(), U256::zero()).await,
            Err(DidError::Validation(_))
        ));
        assert!(matches!(
            registrar.approve(Address::repeat_byte(0x01), U256::from(100)).await,
            Err(DidError::Validation(_))
        ));
        assert!(registry.sent().is_empty());
    }

    #[tokio::test]
    async fn register_uses_default_key_once() {
        let owner = Address::repeat_byte(0x44);
        let (registry, registrar) = setup(FakeRegistry::default().with_signer(owner));
        registrar.register().await.unwrap();
        assert_eq!(registry.sent(), vec!["registerDid(1)".to_string()]);

        let taken = FakeRegistry::default().with_key(owner, owner).with_signer(owner);
        let (_, registrar) = setup(taken);
        assert!(matches!(registrar.register().await, Err(DidError::Validation(_))));
    }

    #[tokio::test]
    async fn read_only_client_cannot_write() {
        let (_, registrar) = setup(FakeRegistry::default().with_key(alice(), alice()));
        assert!(matches!(registrar.request_tokens().await, Err(DidError::NoSigner)));
        assert!(matches!(
            registrar.register_name(&Did::for_subject(alice()), "alice").await,
            Err(DidError::NoSigner)
        ));
    }

    #[tokio::test]
    async fn linking_requires_the_accounts_consent() {
        let account = KeyManager::from_hex(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let fake = FakeRegistry::default().with_key(alice(), alice()).with_signer(alice());
        let (registry, registrar) = setup(fake);
        let did = Did::for_subject(alice());

        let request = |signature: Option<Bytes>| LinkRequest {
            id: "hot-wallet".into(),
            account: account.address(),
            purpose: "payments".into(),
            signature,
        };

        let missing = registrar.link_account(&did, request(None)).await;
        assert!(matches!(missing, Err(DidError::Validation(_))));

        let wrong = account.sign_link_consent(alice(), "login").await.unwrap();
        let wrong = registrar
            .link_account(&did, request(Some(Bytes::from(wrong.to_vec()))))
            .await;
        assert!(matches!(wrong, Err(DidError::Signature(_))));

        let consent = account.sign_link_consent(alice(), "payments").await.unwrap();
        registrar
            .link_account(&did, request(Some(Bytes::from(consent.to_vec()))))
            .await
            .unwrap();
        assert_eq!(
            registry.sent(),
            vec![format!(
                "registerLinkedAccount({:?}, hot-wallet, {:?})",
                alice(),
                account.address()
            )]
        );
    }

    #[tokio::test]
    async fn signer_links_itself_without_explicit_consent() {
        let fake = FakeRegistry::default().with_key(alice(), alice()).with_signer(alice());
        let (registry, registrar) = setup(fake);
        let request = LinkRequest {
            id: "self".into(),
            account: alice(),
            purpose: "login".into(),
            signature: None,
        };
        registrar.link_account(&Did::for_subject(alice()), request).await.unwrap();
        assert_eq!(registry.sent().len(), 1);
    }
}
