//! Resolution and access rules. Nothing here performs I/O.

pub mod access;
pub mod eligibility;
pub mod lookup;
pub mod resolver;

pub use access::{did_found, has_write_access, AccessState};
pub use eligibility::{registration_step, RegistrationInputs, RegistrationStep};
pub use lookup::Lookup;
pub use resolver::{initial_input, resolve, DidSelector, LookupOutcome, LookupTicket, Lookups, Resolution};
