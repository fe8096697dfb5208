// src/identity/lookup.rs
//! State of a single external read as seen by the pure evaluators.

use crate::error::Result;
use serde::Serialize;

/// Latest known state of one asynchronous registry read.
///
/// `Missing` is a definite negative answer. `Failed` means the answer is unknown and
/// must never be treated as `Missing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Lookup<T> {
    Pending,
    Missing,
    Found(T),
    Failed(String),
}

impl<T> Default for Lookup<T> {
    fn default() -> Self {
        Lookup::Pending
    }
}

impl<T> Lookup<T> {
    /// Converts a read result where `Ok(None)` is the registry's negative answer.
    pub fn from_result(result: Result<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Lookup::Found(value),
            Ok(None) => Lookup::Missing,
            Err(err) => Lookup::Failed(err.to_string()),
        }
    }

    /// Converts a read result that always yields a value.
    pub fn from_value(result: Result<T>) -> Self {
        match result {
            Ok(value) => Lookup::Found(value),
            Err(err) => Lookup::Failed(err.to_string()),
        }
    }

    pub fn found(&self) -> Option<&T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Lookup::Pending)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Lookup::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DidError;

    #[test]
    fn failure_is_not_a_negative_answer() {
        let failed: Lookup<u8> = Lookup::from_result(Err(DidError::Provider("down".into())));
        assert_ne!(failed, Lookup::Missing);
        assert_eq!(failed.error(), Some("provider error: down"));

        let missing: Lookup<u8> = Lookup::from_result(Ok(None));
        assert_eq!(missing, Lookup::Missing);
        assert!(missing.error().is_none());
    }

    #[test]
    fn defaults_to_pending() {
        let lookup: Lookup<bool> = Lookup::default();
        assert!(lookup.is_pending());
        assert_eq!(Lookup::from_value(Ok(true)).found(), Some(&true));
    }
}
