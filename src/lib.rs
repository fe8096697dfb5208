// src/lib.rs

//! # dgen DID client
//!
//! Resolver, access evaluator and registry client for `did:dgen` identities whose
//! records live in registry contracts on zkSync Era.
//!
//! ## Architecture Overview
//! 1. **Identity Layer**: pure resolution, write-access and registration rules (`identity`)
//! 2. **Blockchain Layer**: `ZkSyncClient` and the registry bindings (`blockchain`, `contracts`)
//! 3. **Services Layer**: search sessions, profile reads, writes and the HTTP API (`services`)
//! 4. **Cryptography Layer**: wallet key and account-link consent (`wallet`, `utils`)

pub mod blockchain; // zkSync JSON-RPC access
pub mod config;     // Layered settings
pub mod contracts;  // Registry, token and faucet bindings
pub mod error;      // DidError and Result
pub mod identity;   // Resolution and access rules
pub mod models;     // Data structures
pub mod services;   // Sessions, writes and the API server
pub mod utils;      // Hashing helpers
pub mod wallet;     // Signing key operations

pub use error::{DidError, Result};
