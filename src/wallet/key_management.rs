// src/wallet/key_management.rs
//! Signing key of the connected wallet.
//!
//! The key signs registry transactions and the consent message that proves an
//! account agreed to be linked to a DID.
//!
//! Uses the following cryptographic primitives:
//! - secp256k1 curve (via `k256` crate)
//! - Keccak-256 hashing and EIP-191 personal messages (via `ethers` crate)

use crate::error::{DidError, Result};
use crate::utils::crypto::link_consent_hash;
use ethers::signers::{LocalWallet, Signer, Wallet};
use ethers::types::{Address, Signature};
use ethers::utils::hex;
use k256::ecdsa::SigningKey;

/// Wallet key material, never exposed beyond signing.
#[derive(Clone, Debug)]
pub struct KeyManager {
    wallet: LocalWallet,
}

impl KeyManager {
    /// Loads a hex-encoded secp256k1 private key (with or without `0x`).
    ///
    /// # Errors
    /// [`DidError::Config`] when the value is not hex or not a valid scalar.
    pub fn from_hex(private_key: &str) -> Result<Self> {
        let bytes = hex::decode(private_key.trim().trim_start_matches("0x"))
            .map_err(|e| DidError::Config(format!("private key is not hex: {e}")))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| DidError::Config(format!("invalid private key: {e}")))?;
        Ok(KeyManager {
            wallet: Wallet::from(signing_key),
        })
    }

    /// Binds signatures to a chain, as required for transaction signing.
    pub fn with_chain_id(self, chain_id: u64) -> Self {
        KeyManager {
            wallet: self.wallet.with_chain_id(chain_id),
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }

    /// Signs the consent to link this wallet's address to `subject` for `purpose`.
    ///
    /// The 32-byte consent hash is signed as an EIP-191 personal message.
    pub async fn sign_link_consent(&self, subject: Address, purpose: &str) -> Result<Signature> {
        let hash = link_consent_hash(subject, self.address(), purpose)?;
        Ok(self.wallet.sign_message(hash.as_bytes()).await?)
    }
}

/// Checks that `signature` is `account`'s consent to be linked to `subject`.
///
/// # Errors
/// [`DidError::Signature`] when the signature is malformed or recovers to another
/// address.
pub fn verify_link_consent(
    subject: Address,
    account: Address,
    purpose: &str,
    signature: &[u8],
) -> Result<()> {
    let signature = Signature::try_from(signature)
        .map_err(|e| DidError::Signature(format!("malformed signature: {e}")))?;
    let hash = link_consent_hash(subject, account, purpose)?;
    signature
        .verify(hash.as_bytes(), account)
        .map_err(|e| DidError::Signature(e.to_string()))
}
