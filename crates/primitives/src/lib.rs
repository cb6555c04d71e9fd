//! Core types shared by the consistency layer: account identifiers, session
//! profiles, store timestamps and the injectable wall clock.

/// Signed-in account profile supplied by the identity provider.
pub mod account;
/// Identifier types for accounts.
pub mod ids;
/// Timestamp codec and clocks.
pub mod time;

pub use account::SessionAccount;
pub use ids::AccountId;
pub use time::{AnchoredClock, Clock, SystemClock, timestamp};
