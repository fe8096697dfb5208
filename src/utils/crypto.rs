// src/utils/crypto.rs
//! Hashing helpers matching what the registries compute on-chain.
//!
//! All hashes are Keccak-256, Solidity's `keccak256()`.

use crate::error::{DidError, Result};
use ethers::abi::{encode_packed, Token};
use ethers::types::{Address, H256};
use ethers::utils::keccak256;
use once_cell::sync::Lazy;

/// Key usage granting write access to a DID's records: `keccak256("auth")`.
pub static KEY_USAGE_AUTH: Lazy<H256> = Lazy::new(|| H256::from(hash_data(b"auth")));

/// Computes a Keccak-256 hash of the input data.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Message a linked account signs to consent to being linked to `subject`.
///
/// Equivalent to `keccak256(abi.encodePacked(subject, account, purpose))`.
pub fn link_consent_hash(subject: Address, account: Address, purpose: &str) -> Result<H256> {
    let packed = encode_packed(&[
        Token::Address(subject),
        Token::Address(account),
        Token::String(purpose.to_string()),
    ])
    .map_err(|e| DidError::Abi(e.to_string()))?;
    Ok(H256::from(hash_data(&packed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_usage_matches_registry_constant() {
        assert_eq!(
            format!("{:?}", *KEY_USAGE_AUTH),
            "0xb9208574d39bc6b85a528191d39d983f3a0bc58ef7129343fde819f64f7268cd"
        );
    }

    #[test]
    fn consent_hash_packs_addresses_without_padding() {
        let subject = Address::repeat_byte(0x11);
        let account = Address::repeat_byte(0x22);

        let mut packed = Vec::new();
        packed.extend_from_slice(subject.as_bytes());
        packed.extend_from_slice(account.as_bytes());
        packed.extend_from_slice(b"login");

        assert_eq!(
            link_consent_hash(subject, account, "login").unwrap(),
            H256::from(hash_data(&packed))
        );
        assert_ne!(
            link_consent_hash(subject, account, "login").unwrap(),
            link_consent_hash(account, subject, "login").unwrap()
        );
    }
}
