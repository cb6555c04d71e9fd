//! Invitation codes: six-character `[A-Z0-9]` handles mapping to one owner.
//!
//! Uniqueness rests on existence-check-before-write against a shared lookup
//! collection (one document per code, keyed by the code). The store offers no
//! uniqueness constraint, so two concurrent allocators may collide and redraw.

mod allocator;
mod code;
pub mod error;
mod source;

pub use allocator::{CODE_FIELD, CodeAllocator, OWNER_FIELD, ReserveOutcome};
pub use code::{ALPHABET, CODE_LEN, InvitationCode};
pub use error::{CodeError, Result};
pub use source::{CodeSource, RandomCodes};
