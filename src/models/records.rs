// src/models/records.rs
//! Records held by the DID registries, and the payloads used to create them.
//!
//! The registries own these records; the crate only keeps transient copies. ABI
//! tuples returned by the contracts are converted here so nothing downstream deals
//! with raw tokens.

use crate::error::{DidError, Result};
use crate::models::did::format_address;
use crate::utils::crypto::KEY_USAGE_AUTH;
use ethers::types::{Address, Bytes, H256};
use ethers::utils::hex;
use serde::{Deserialize, Serialize};

/// `Key { string id; uint8 keyType; bytes32[] keyUsages; bytes publicKey; bool sudo; }`
pub type KeyTuple = (String, u8, Vec<H256>, Bytes, bool);

/// `ServiceAccount { string id; string[] types; string[] endpoints; }`
pub type ServiceAccountTuple = (String, Vec<String>, Vec<String>);

/// `LinkedAccount { string id; address account; string purpose; bytes signature; }`
pub type LinkedAccountTuple = (String, Address, String, Bytes);

/// A key registered for a DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Caller-assigned, unique within the DID
    pub id: String,
    /// Informational key type code
    pub key_type: u8,
    /// Hashed usage tags, e.g. `keccak256("auth")`
    pub key_usages: Vec<H256>,
    /// Lowercase `0x` hex of the public key bytes
    pub public_key: String,
    pub sudo: bool,
}

impl KeyRecord {
    /// True when the key carries the authentication usage.
    pub fn is_auth(&self) -> bool {
        self.key_usages.contains(&*KEY_USAGE_AUTH)
    }

    /// Case-insensitive comparison of the public key against a wallet address.
    pub fn belongs_to(&self, address: Address) -> bool {
        self.public_key.eq_ignore_ascii_case(&format_address(address))
    }
}

impl From<KeyTuple> for KeyRecord {
    fn from((id, key_type, key_usages, public_key, sudo): KeyTuple) -> Self {
        KeyRecord {
            id,
            key_type,
            key_usages,
            public_key: format!("0x{}", hex::encode(&public_key)),
            sudo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountRecord {
    pub id: String,
    pub types: Vec<String>,
    pub endpoints: Vec<String>,
}

impl From<ServiceAccountTuple> for ServiceAccountRecord {
    fn from((id, types, endpoints): ServiceAccountTuple) -> Self {
        ServiceAccountRecord { id, types, endpoints }
    }
}

impl From<ServiceAccountRecord> for ServiceAccountTuple {
    fn from(record: ServiceAccountRecord) -> Self {
        (record.id, record.types, record.endpoints)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccountRecord {
    pub id: String,
    pub account: Address,
    pub purpose: String,
    /// Consent signature produced by `account` when the link was created
    pub signature: Bytes,
}

impl From<LinkedAccountTuple> for LinkedAccountRecord {
    fn from((id, account, purpose, signature): LinkedAccountTuple) -> Self {
        LinkedAccountRecord { id, account, purpose, signature }
    }
}

/// Payload for `addKey` / `registerDid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewKey {
    pub id: String,
    pub key_type: u8,
    pub key_usages: Vec<String>,
    pub public_key: String,
    #[serde(default)]
    pub sudo: bool,
}

impl NewKey {
    /// Default authentication key bound to a wallet, used on self-registration.
    pub fn default_for(owner: Address) -> Self {
        NewKey {
            id: "default".to_string(),
            key_type: 0,
            key_usages: vec![format!("{:?}", *KEY_USAGE_AUTH)],
            public_key: format_address(owner),
            sudo: true,
        }
    }

    /// Validates the payload and converts it into the ABI tuple.
    ///
    /// # Errors
    /// [`DidError::Validation`] when the id is empty, no usage is given, or a usage or the
    /// public key is not `0x`-prefixed hex.
    pub fn into_tuple(self) -> Result<KeyTuple> {
        if self.id.trim().is_empty() {
            return Err(DidError::Validation("key id must not be empty".into()));
        }
        if self.key_usages.is_empty() {
            return Err(DidError::Validation("at least one key usage is required".into()));
        }
        let usages = self
            .key_usages
            .iter()
            .map(|usage| parse_usage(usage))
            .collect::<Result<Vec<_>>>()?;
        if !self.public_key.starts_with("0x") {
            return Err(DidError::Validation("public key must be 0x-prefixed hex".into()));
        }
        let public_key: Bytes = self
            .public_key
            .parse()
            .map_err(|_| DidError::Validation(format!("invalid public key {}", self.public_key)))?;
        Ok((self.id, self.key_type, usages, public_key, self.sudo))
    }
}

fn parse_usage(usage: &str) -> Result<H256> {
    if !usage.starts_with("0x") {
        return Err(DidError::Validation(format!("key usage {usage} must be 0x-prefixed")));
    }
    usage
        .parse()
        .map_err(|_| DidError::Validation(format!("key usage {usage} is not a 32-byte hash")))
}

impl ServiceAccountRecord {
    /// Rejects accounts without an id, type or endpoint.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DidError::Validation("service account id must not be empty".into()));
        }
        if self.types.iter().all(|t| t.trim().is_empty()) {
            return Err(DidError::Validation("at least one service type is required".into()));
        }
        if self.endpoints.iter().all(|e| e.trim().is_empty()) {
            return Err(DidError::Validation("at least one endpoint is required".into()));
        }
        Ok(())
    }
}
