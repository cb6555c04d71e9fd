//! Exclusive owner/dependent pairing.
//!
//! A dependent account gets at most one owner, ever. The owner is recorded on
//! the dependent's own account document; a legacy link collection is written
//! alongside for older readers and consulted on every pairing attempt.
//!
//! The store has no multi-document transactions, so every write is preceded
//! by a read and the first observed owner wins. A conflict is an ordinary
//! [`PairOutcome`], never an error.

mod catalog;
pub mod error;
mod identity;
mod linker;
mod service;

pub use catalog::{CourseCatalog, GrantReport, Notice, Offering, grant_offerings};
pub use error::{CatalogError, LinkError, PairError, Result};
pub use identity::{Identity, LocalIdentity, SessionEvent};
pub use linker::{InvitationLinker, LinkOutcome};
pub use service::{LEGACY_DEPENDENT_FIELD, LEGACY_OWNER_FIELD, OWNER_FIELD, PairOutcome, PairingService};
