// src/error.rs
//! Error types shared by the resolver, the registry client and the API server.

use thiserror::Error;

/// Library-wide error type.
///
/// Read failures are not surfaced through this type by the resolver itself: the
/// coordinator converts them into [`crate::identity::lookup::Lookup::Failed`] so that a
/// failed read stays distinguishable from a negative answer.
#[derive(Error, Debug)]
pub enum DidError {
    /// Input could not be parsed as a 20-byte hex address
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Input does not carry a recognized `did:` prefix or has a malformed subject
    #[error("invalid DID: {0}")]
    InvalidDid(String),

    /// Request payload rejected before any transaction was built
    #[error("validation error: {0}")]
    Validation(String),

    /// Settings could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON-RPC transport or node error
    #[error("provider error: {0}")]
    Provider(String),

    /// Contract call failed or its return data could not be decoded
    #[error("contract error: {0}")]
    Contract(String),

    /// Contract call reverted; registries revert on unknown lookups
    #[error("call reverted: {0}")]
    Reverted(String),

    /// ABI could not be parsed or the method is unknown
    #[error("abi error: {0}")]
    Abi(String),

    /// Transaction was dropped or reverted
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// Signing or signature recovery failed
    #[error("signature error: {0}")]
    Signature(String),

    /// The signing wallet holds no write-capable key for the DID
    #[error("no write access to {0}")]
    Forbidden(String),

    /// A write was requested but no wallet key is configured
    #[error("no signing wallet configured")]
    NoSigner,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DidError>;

impl From<config::ConfigError> for DidError {
    fn from(err: config::ConfigError) -> Self {
        DidError::Config(err.to_string())
    }
}

impl From<ethers::providers::ProviderError> for DidError {
    fn from(err: ethers::providers::ProviderError) -> Self {
        DidError::Provider(err.to_string())
    }
}

impl From<ethers_core::abi::AbiError> for DidError {
    fn from(err: ethers_core::abi::AbiError) -> Self {
        DidError::Abi(err.to_string())
    }
}

impl From<ethers::signers::WalletError> for DidError {
    fn from(err: ethers::signers::WalletError) -> Self {
        DidError::Signature(err.to_string())
    }
}
