// src/identity/resolver.rs
//! Identifier resolution.
//!
//! A user-entered string may be a full DID, a bare subject address, a registered
//! name, or an account linked to some DID. Nothing in the string says which, so three
//! lookups run for every input and a fixed precedence picks the answer:
//!
//! 1. name registry match
//! 2. linked-account reverse index match
//! 3. key registry reports the stripped subject exists
//!
//! [`resolve`] is a pure function of the input and the latest state of each lookup.
//! [`DidSelector`] wraps it with the generation bookkeeping needed to drop answers
//! that belong to superseded inputs.

use crate::identity::lookup::Lookup;
use crate::models::did::{has_did_prefix, parse_address, strip_did_prefix, Did};
use ethers::types::Address;
use log::debug;
use serde::Serialize;

/// Latest state of the three lookups for one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Lookups {
    /// Subject registered under the input as a name
    pub name: Lookup<Address>,
    /// Subject that linked the input as an account
    pub link: Lookup<Address>,
    /// Stripped input, when the key registry reports it exists
    pub direct: Lookup<Address>,
}

/// Outcome of evaluating [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "did", rename_all = "snake_case")]
pub enum Resolution {
    /// Nothing to change: empty input, or a deciding lookup has not answered
    Unchanged,
    Resolved(Did),
    /// All three lookups answered negatively
    NotFound,
}

/// Resolves `raw` from the current lookup states.
///
/// A pending or failed lookup blocks every lower-precedence branch and the not-found
/// outcome.
pub fn resolve(raw: &str, lookups: &Lookups) -> Resolution {
    if raw.is_empty() {
        return Resolution::Unchanged;
    }

    for branch in [&lookups.name, &lookups.link] {
        match branch {
            Lookup::Found(subject) if !subject.is_zero() => {
                return Resolution::Resolved(Did::for_subject(*subject));
            }
            Lookup::Found(_) | Lookup::Missing => continue,
            Lookup::Pending | Lookup::Failed(_) => return Resolution::Unchanged,
        }
    }

    match &lookups.direct {
        Lookup::Found(_) if has_did_prefix(raw) => Resolution::Resolved(Did::verbatim(raw)),
        Lookup::Found(_) => Resolution::Resolved(Did::from_bare(raw)),
        Lookup::Missing => Resolution::NotFound,
        Lookup::Pending | Lookup::Failed(_) => Resolution::Unchanged,
    }
}

/// Reads to issue for one input, tagged with the generation that requested them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    pub generation: u64,
    /// Name registry key: the raw input
    pub name: String,
    /// Raw input as an address; `None` when it is not one and no read is needed
    pub link: Option<Address>,
    /// Prefix-stripped input as an address; `None` when it is not one
    pub direct: Option<Address>,
}

/// A completed lookup, fed back into [`DidSelector::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Name(Lookup<Address>),
    Link(Lookup<Address>),
    Direct(Lookup<Address>),
}

/// Owner of the resolved DID for one search session.
///
/// The resolved DID is only ever written by recomputing [`resolve`] after an input
/// change or a lookup completion.
#[derive(Debug, Clone, Default)]
pub struct DidSelector {
    input: String,
    generation: u64,
    lookups: Lookups,
    resolved: Option<Did>,
}

impl DidSelector {
    /// Starts a session showing `initial` when it is a well-formed DID.
    pub fn new(initial: &str) -> Self {
        DidSelector {
            resolved: Did::parse(initial).ok(),
            ..Default::default()
        }
    }

    /// Records a new raw input and returns the reads it needs.
    ///
    /// Any lookups still in flight for earlier inputs become stale. An empty input issues
    /// no reads and leaves the resolved DID as it is.
    pub fn set_input(&mut self, raw: &str) -> Option<LookupTicket> {
        self.generation += 1;
        self.input = raw.to_string();

        if raw.is_empty() {
            self.lookups = Lookups::default();
            return None;
        }

        let link = parse_address(raw);
        let direct = parse_address(strip_did_prefix(raw));
        let expected = |addr: Option<Address>| match addr {
            Some(_) => Lookup::Pending,
            None => Lookup::Missing,
        };
        self.lookups = Lookups {
            name: Lookup::Pending,
            link: expected(link),
            direct: expected(direct),
        };
        debug!("resolving {raw:?} (generation {})", self.generation);

        Some(LookupTicket {
            generation: self.generation,
            name: raw.to_string(),
            link,
            direct,
        })
    }

    /// Stores a lookup outcome and recomputes the resolution.
    ///
    /// Returns `false`, leaving all state untouched, when `generation` is not the current
    /// one.
    pub fn apply(&mut self, generation: u64, outcome: LookupOutcome) -> bool {
        if generation != self.generation {
            debug!(
                "discarding stale lookup for generation {generation}, current is {}",
                self.generation
            );
            return false;
        }

        match outcome {
            LookupOutcome::Name(lookup) => self.lookups.name = lookup,
            LookupOutcome::Link(lookup) => self.lookups.link = lookup,
            LookupOutcome::Direct(lookup) => self.lookups.direct = lookup,
        }

        match resolve(&self.input, &self.lookups) {
            Resolution::Resolved(did) => self.resolved = Some(did),
            Resolution::NotFound => self.resolved = Some(Did::not_found()),
            Resolution::Unchanged => {}
        }
        true
    }

    /// Follows a wallet account switch: the connected account's own DID becomes current.
    pub fn on_account_changed(&mut self, connected: Option<Address>) {
        self.generation += 1;
        self.lookups = Lookups::default();
        self.input.clear();
        self.resolved = connected.map(Did::for_subject);
    }

    pub fn resolved(&self) -> Option<&Did> {
        self.resolved.as_ref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn lookups(&self) -> &Lookups {
        &self.lookups
    }

    /// Resolution for the current input and lookups, without touching state.
    pub fn resolution(&self) -> Resolution {
        resolve(&self.input, &self.lookups)
    }
}

/// Input a session starts from: the `q` query parameter, else the connected wallet's DID.
pub fn initial_input(query: Option<&str>, connected: Option<Address>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(q) => q.to_string(),
        None => connected
            .map(|addr| Did::for_subject(addr).to_string())
            .unwrap_or_default(),
    }
}
