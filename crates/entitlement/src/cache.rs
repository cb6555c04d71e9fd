use std::collections::HashMap;

use chrono::{DateTime, Utc};
use lyceum_primitives::AccountId;
use parking_lot::Mutex;

use crate::EntitlementState;

/// Identity of one rejection event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RejectionMark {
	pub(crate) record_id: String,
	pub(crate) key: DateTime<Utc>,
}

/// Rejection-banner bookkeeping carried from one watch to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RejectionMarks {
	/// Rejection currently shown and the end of its banner.
	pub(crate) shown: Option<(RejectionMark, DateTime<Utc>)>,
	/// Rejection whose banner already ended.
	pub(crate) dismissed: Option<RejectionMark>,
}

#[derive(Debug, Default)]
struct Entry {
	state: Option<EntitlementState>,
	marks: RejectionMarks,
}

/// Last resolved entitlement per account.
///
/// New watches start from the cached value, so gating keeps the last known
/// good state while the first snapshot is still in flight. The rejection
/// banner marks travel with it: switching back to an account resumes its
/// banner instead of restarting it.
#[derive(Debug, Default)]
pub struct EntitlementCache {
	entries: Mutex<HashMap<AccountId, Entry>>,
}

impl EntitlementCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, account: &AccountId) -> Option<EntitlementState> {
		self.entries.lock().get(account).and_then(|entry| entry.state.clone())
	}

	pub fn put(&self, account: &AccountId, state: EntitlementState) {
		self.entries.lock().entry(account.clone()).or_default().state = Some(state);
	}

	/// Drops the cached state and banner marks, e.g. on sign-out.
	pub fn forget(&self, account: &AccountId) {
		self.entries.lock().remove(account);
	}

	pub(crate) fn marks(&self, account: &AccountId) -> RejectionMarks {
		self.entries.lock().get(account).map(|entry| entry.marks.clone()).unwrap_or_default()
	}

	pub(crate) fn put_marks(&self, account: &AccountId, marks: RejectionMarks) {
		self.entries.lock().entry(account.clone()).or_default().marks = marks;
	}
}
