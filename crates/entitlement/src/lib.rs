//! Entitlement resolution over an unordered stream of payment records.
//!
//! The [`EntitlementResolver`] watches every payment record of an account,
//! plus the global trial policy, and recomputes one [`EntitlementState`] on
//! each change. Precedence is approved > pending > recent rejection > trial,
//! decided purely from timestamps inside the records (see [`evaluate`]).
//!
//! Store failures never reach consumers: the last known state stays in place
//! and the resolver re-subscribes in the background.

mod cache;
pub mod evaluate;
mod policy;
pub mod record;
mod resolver;
mod session;
mod state;

pub use cache::EntitlementCache;
pub use evaluate::{Evaluation, evaluate, trial_state};
pub use policy::PolicyCache;
pub use record::{PaymentRecord, PaymentStatus};
pub use resolver::{EntitlementResolver, EntitlementWatch, ResolverSettings};
pub use session::AccountEntitlements;
pub use state::{Access, EntitlementKind, EntitlementState};
