//! Derived entitlement state and feature gating.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The single derived value gating paid-feature access for one account.
///
/// Recomputed from scratch on every snapshot; never patched incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EntitlementState {
	#[serde(rename_all = "camelCase")]
	TrialActive { trial_ends_at: DateTime<Utc> },
	#[serde(rename_all = "camelCase")]
	TrialExpired { trial_ended_at: DateTime<Utc> },
	#[serde(rename_all = "camelCase")]
	Pending { plan_id: String },
	#[serde(rename_all = "camelCase")]
	Approved {
		plan_id: String,
		expires_at: Option<DateTime<Utc>>,
	},
	#[serde(rename_all = "camelCase")]
	RejectedRecent {
		plan_id: String,
		visible_until: DateTime<Utc>,
	},
}

/// Discriminant of [`EntitlementState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntitlementKind {
	TrialActive,
	TrialExpired,
	Pending,
	Approved,
	RejectedRecent,
}

/// What the gated surface may show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
	/// Paid features unlocked (paid, or trial preview).
	Full,
	/// Paid features locked.
	Locked,
}

impl EntitlementState {
	pub fn kind(&self) -> EntitlementKind {
		match self {
			Self::TrialActive { .. } => EntitlementKind::TrialActive,
			Self::TrialExpired { .. } => EntitlementKind::TrialExpired,
			Self::Pending { .. } => EntitlementKind::Pending,
			Self::Approved { .. } => EntitlementKind::Approved,
			Self::RejectedRecent { .. } => EntitlementKind::RejectedRecent,
		}
	}

	/// True only for a valid approval.
	pub fn is_paid(&self) -> bool {
		self.kind() == EntitlementKind::Approved
	}

	/// Gating predicate. An active trial unlocks the same surface as an approval.
	pub fn access(&self) -> Access {
		match self.kind() {
			EntitlementKind::Approved | EntitlementKind::TrialActive => Access::Full,
			_ => Access::Locked,
		}
	}

	/// Instant at which this state ends on its own, without a new snapshot.
	///
	/// Rejection banners are excluded; they are cleared by their own timer.
	pub fn deadline(&self) -> Option<DateTime<Utc>> {
		match self {
			Self::TrialActive { trial_ends_at } => Some(*trial_ends_at),
			Self::Approved { expires_at, .. } => *expires_at,
			_ => None,
		}
	}
}

impl Access {
	/// Gating for a watch that may not have resolved yet.
	pub fn of(state: Option<&EntitlementState>) -> Self {
		state.map_or(Self::Locked, EntitlementState::access)
	}

	pub fn is_full(self) -> bool {
		self == Self::Full
	}
}
