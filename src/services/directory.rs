// src/services/directory.rs
//! Read side of the DID registries.
//!
//! A [`Session`] owns one [`DidSelector`] and drives it: each new input issues the
//! resolver's lookups concurrently and feeds every completion back under the input's
//! generation, so answers for superseded inputs are dropped. [`Directory`] adds the
//! profile and registration-eligibility reads.

use crate::contracts::{DidReader, PaymentToken};
use crate::error::Result;
use crate::identity::{
    registration_step, AccessState, DidSelector, Lookup, LookupOutcome, LookupTicket, Lookups,
    RegistrationInputs, RegistrationStep, Resolution,
};
use crate::models::did::{Did, DidDocument, Section};
use ethers::types::{Address, U256};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use log::{debug, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// State of a session after its latest input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub input: String,
    pub generation: u64,
    pub resolution: Resolution,
    /// DID currently shown, if any
    pub resolved: Option<Did>,
    pub lookups: Lookups,
}

/// One user's search session.
pub struct Session<R> {
    reader: Arc<R>,
    selector: Mutex<DidSelector>,
}

impl<R: DidReader> Session<R> {
    /// Starts a session showing `initial` when it is a well-formed DID.
    pub fn new(reader: Arc<R>, initial: &str) -> Self {
        Session {
            reader,
            selector: Mutex::new(DidSelector::new(initial)),
        }
    }

    fn selector(&self) -> MutexGuard<'_, DidSelector> {
        self.selector.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets a new raw input and waits until its lookups have all answered.
    ///
    /// When a later call supersedes this input, the remaining answers are discarded
    /// and the returned snapshot reflects whatever input is current by then.
    pub async fn search(&self, raw: &str) -> SessionSnapshot {
        let ticket = self.selector().set_input(raw);
        if let Some(ticket) = ticket {
            let generation = ticket.generation;
            let mut pending = self.issue(ticket);
            while let Some(outcome) = pending.next().await {
                self.selector().apply(generation, outcome);
            }
        }
        self.snapshot()
    }

    /// Starts the reads named by `ticket`; malformed branches issue nothing.
    fn issue(&self, ticket: LookupTicket) -> FuturesUnordered<BoxFuture<'_, LookupOutcome>> {
        let reader = &*self.reader;
        let pending = FuturesUnordered::new();

        let name = ticket.name;
        pending.push(
            async move {
                let result = reader.did_for_name(&name).await;
                LookupOutcome::Name(lookup("getDidForName", result))
            }
            .boxed(),
        );

        if let Some(account) = ticket.link {
            pending.push(
                async move {
                    let result = reader.did_by_linked_account(account).await;
                    LookupOutcome::Link(lookup("getDidByLinkedAccount", result))
                }
                .boxed(),
            );
        }

        if let Some(subject) = ticket.direct {
            pending.push(
                async move {
                    let result = reader
                        .did_exists(subject)
                        .await
                        .map(|exists| exists.then_some(subject));
                    LookupOutcome::Direct(lookup("didExists", result))
                }
                .boxed(),
            );
        }

        pending
    }

    /// Follows a switch of the connected wallet.
    pub fn on_account_changed(&self, connected: Option<Address>) {
        self.selector().on_account_changed(connected);
    }

    pub fn resolved(&self) -> Option<Did> {
        self.selector().resolved().cloned()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let selector = self.selector();
        SessionSnapshot {
            input: selector.input().to_string(),
            generation: selector.generation(),
            resolution: selector.resolution(),
            resolved: selector.resolved().cloned(),
            lookups: selector.lookups().clone(),
        }
    }
}

fn lookup<T>(method: &str, result: Result<Option<T>>) -> Lookup<T> {
    if let Err(err) = &result {
        warn!("{method} failed: {err}");
    }
    Lookup::from_result(result)
}

/// Registration facts for one address, with the step they lead to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationStatus {
    pub address: Option<Address>,
    pub step: RegistrationStep,
    pub did_exists: Lookup<bool>,
    pub balance: Lookup<U256>,
    pub allowance: Lookup<U256>,
    pub required: U256,
}

/// Registry reads shared by every session.
pub struct Directory<R> {
    reader: Arc<R>,
    /// Registry that pulls the registration fee
    fee_spender: Address,
    required: U256,
}

impl<R: DidReader + PaymentToken> Directory<R> {
    pub fn new(reader: Arc<R>, fee_spender: Address, required: U256) -> Self {
        Directory { reader, fee_spender, required }
    }

    pub fn session(&self, initial: &str) -> Session<R> {
        Session::new(self.reader.clone(), initial)
    }

    /// Resolves one input in a fresh session.
    pub async fn resolve(&self, raw: &str) -> SessionSnapshot {
        self.session("").search(raw).await
    }

    /// Fetches everything known about `did`, evaluating access for `connected`.
    ///
    /// Each collection is read concurrently and reports its own error; a failed read
    /// never shows up as an empty collection.
    ///
    /// # Errors
    /// [`crate::error::DidError::InvalidAddress`] when the DID's subject is malformed.
    pub async fn document(&self, did: &Did, connected: Option<Address>) -> Result<DidDocument> {
        let subject = did.subject()?;
        debug!("loading profile of {did}");

        let reader = &*self.reader;
        let (name, keys, service_accounts, linked_accounts) = futures::join!(
            reader.name_for_did(subject),
            reader.keys(subject),
            reader.service_accounts(subject),
            reader.linked_accounts(subject),
        );

        let keys = Lookup::from_value(keys);
        let access = AccessState::evaluate(&keys, connected);

        Ok(DidDocument {
            id: did.clone(),
            found: access.found,
            write_access: access.write_access,
            name: Section::from_result(name),
            keys: section(keys),
            service_accounts: Section::from_result(service_accounts),
            linked_accounts: Section::from_result(linked_accounts),
        })
    }

    /// Works out what `connected` must do before it can register its own DID.
    pub async fn registration_status(&self, connected: Option<Address>) -> RegistrationStatus {
        let inputs = match connected {
            None => RegistrationInputs {
                connected,
                did_exists: Lookup::Pending,
                balance: Lookup::Pending,
                allowance: Lookup::Pending,
                required: self.required,
            },
            Some(owner) => {
                let reader = &*self.reader;
                let (did_exists, balance, allowance) = futures::join!(
                    reader.did_exists(owner),
                    reader.token_balance(owner),
                    reader.allowance(owner, self.fee_spender),
                );
                RegistrationInputs {
                    connected,
                    did_exists: Lookup::from_value(did_exists),
                    balance: Lookup::from_value(balance),
                    allowance: Lookup::from_value(allowance),
                    required: self.required,
                }
            }
        };

        RegistrationStatus {
            address: connected,
            step: registration_step(&inputs),
            did_exists: inputs.did_exists,
            balance: inputs.balance,
            allowance: inputs.allowance,
            required: inputs.required,
        }
    }
}

fn section<T>(lookup: Lookup<T>) -> Section<T> {
    match lookup {
        Lookup::Found(data) => Section { data: Some(data), error: None },
        Lookup::Failed(error) => Section { data: None, error: Some(error) },
        Lookup::Pending | Lookup::Missing => Section { data: None, error: None },
    }
}
