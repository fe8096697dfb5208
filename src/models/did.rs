// src/models/did.rs
//! Decentralized Identifier (DID) data model for the `did:dgen` method.
//!
//! A DID has the shape `did:<method>:zksync:<subjectAddress>` where `<method>` is
//! `dgen` (current) or `degen` (legacy) and the subject is a 20-byte hex address.

use crate::error::{DidError, Result};
use crate::models::records::{KeyRecord, LinkedAccountRecord, ServiceAccountRecord};
use ethers::types::Address;
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Network segment shared by every DID on the deployed registries.
pub const NETWORK: &str = "zksync";

/// Prefix used when synthesizing a DID.
pub const CANONICAL_PREFIX: &str = "did:dgen:zksync:";

/// The two accepted method spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DidMethod {
    Dgen,
    /// Spelling used by DIDs minted before the rename
    Degen,
}

impl DidMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DidMethod::Dgen => "dgen",
            DidMethod::Degen => "degen",
        }
    }
}

/// Splits `did:de?gen:zksync:` off `input`, returning the method and the remainder.
fn split_prefix(input: &str) -> Option<(DidMethod, &str)> {
    let rest = input.strip_prefix("did:")?;
    let (method, rest) = if let Some(rest) = rest.strip_prefix("dgen:") {
        (DidMethod::Dgen, rest)
    } else if let Some(rest) = rest.strip_prefix("degen:") {
        (DidMethod::Degen, rest)
    } else {
        return None;
    };
    let rest = rest.strip_prefix(NETWORK)?.strip_prefix(':')?;
    Some((method, rest))
}

/// Returns true when `input` starts with a recognized DID prefix.
pub fn has_did_prefix(input: &str) -> bool {
    split_prefix(input).is_some()
}

/// Removes a recognized DID prefix; other inputs are returned untouched.
pub fn strip_did_prefix(input: &str) -> &str {
    split_prefix(input).map_or(input, |(_, rest)| rest)
}

/// Parses a 20-byte hex address, with or without `0x`.
///
/// Returns `None` for anything else, including names and truncated hex.
pub fn parse_address(input: &str) -> Option<Address> {
    let hex = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    hex.parse().ok()
}

/// Lowercase `0x`-prefixed rendering of an address.
pub fn format_address(addr: Address) -> String {
    format!("0x{:x}", addr)
}

/// A DID string as produced by the resolver.
///
/// The value is kept verbatim: a DID found by direct lookup preserves the user's own
/// spelling (legacy method, missing `0x`, mixed case), so equality is string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    /// Validates a full DID string.
    ///
    /// # Errors
    /// [`DidError::InvalidDid`] when the prefix is not recognized or the subject is not a
    /// 20-byte hex address.
    pub fn parse(input: &str) -> Result<Self> {
        match split_prefix(input) {
            Some((_, subject)) if parse_address(subject).is_some() => Ok(Did(input.to_string())),
            _ => Err(DidError::InvalidDid(input.to_string())),
        }
    }

    /// Canonical DID for a subject address, checksummed like wallet-reported addresses.
    pub fn for_subject(subject: Address) -> Self {
        Did(format!("{CANONICAL_PREFIX}{}", to_checksum(&subject, None)))
    }

    /// Canonical prefix around a literal, prefix-less value.
    pub fn from_bare(value: &str) -> Self {
        Did(format!("{CANONICAL_PREFIX}{value}"))
    }

    /// Sentinel returned when no lookup matched.
    pub fn not_found() -> Self {
        Self::for_subject(Address::zero())
    }

    /// Wraps a string that already carries a recognized prefix, without validation.
    pub(crate) fn verbatim(value: &str) -> Self {
        Did(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn method(&self) -> Option<DidMethod> {
        split_prefix(&self.0).map(|(method, _)| method)
    }

    /// Subject address encoded after the prefix.
    ///
    /// # Errors
    /// [`DidError::InvalidAddress`] when the subject is not a 20-byte hex address.
    pub fn subject(&self) -> Result<Address> {
        let subject = strip_did_prefix(&self.0);
        parse_address(subject).ok_or_else(|| DidError::InvalidAddress(subject.to_string()))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.subject(), Ok(addr) if addr.is_zero())
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One fetched collection together with its error indicator.
///
/// `data` stays `None` when the read failed; a failed read is never reported as an
/// empty collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> Section<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Section { data: Some(data), error: None },
            Err(err) => Section { data: None, error: Some(err.to_string()) },
        }
    }
}

/// Everything the registries know about one DID, as shown to the user.
///
/// `found` and `write_access` are both derived from the same `keys` fetch but
/// independently of one another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidDocument {
    pub id: Did,
    pub found: bool,
    pub write_access: bool,
    pub name: Section<Option<String>>,
    pub keys: Section<Vec<KeyRecord>>,
    pub service_accounts: Section<Vec<ServiceAccountRecord>>,
    pub linked_accounts: Section<Vec<LinkedAccountRecord>>,
}
