//! Pure precedence rules over one snapshot of payment records.
//!
//! Precedence: valid approval > pending > most-recent rejection > trial.
//! Ordering comes only from timestamps inside the records, never from
//! delivery order.

use chrono::{DateTime, Utc};
use lyceum_config::TrialPolicy;

use crate::record::{PaymentRecord, PaymentStatus};
use crate::state::EntitlementState;

/// Outcome of evaluating payment records, before rejection-banner and trial handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
	/// The latest approval is unexpired or carries no expiry.
	Approved {
		record_id: String,
		plan_id: String,
		expires_at: Option<DateTime<Utc>>,
	},
	/// No valid approval, at least one submission awaiting review.
	Pending { record_id: String, plan_id: String },
	/// The latest rejection is strictly newer than every approval and pending submission.
	Rejected {
		record_id: String,
		plan_id: String,
		key: DateTime<Utc>,
	},
	/// Nothing in the records decides; evaluate the trial window.
	Fallback,
}

fn latest<'a>(records: impl Iterator<Item = &'a PaymentRecord>) -> Option<&'a PaymentRecord> {
	records.max_by(|a, b| a.ordering_key().cmp(&b.ordering_key()).then_with(|| a.id.cmp(&b.id)))
}

/// Applies the precedence rules to one full snapshot.
pub fn evaluate(records: &[PaymentRecord], now: DateTime<Utc>) -> Evaluation {
	let approved = latest(records.iter().filter(|r| matches!(r.status, PaymentStatus::Approved { .. })));
	let pending = latest(records.iter().filter(|r| r.is_pending()));
	let rejected = latest(records.iter().filter(|r| matches!(r.status, PaymentStatus::Rejected { .. })));

	if let Some(record) = approved
		&& let PaymentStatus::Approved { expires_at, .. } = record.status
		&& expires_at.is_none_or(|expiry| now < expiry)
	{
		return Evaluation::Approved {
			record_id: record.id.clone(),
			plan_id: record.plan_id.clone(),
			expires_at,
		};
	}

	if let Some(record) = pending {
		return Evaluation::Pending {
			record_id: record.id.clone(),
			plan_id: record.plan_id.clone(),
		};
	}

	if let Some(record) = rejected {
		let key = record.ordering_key();
		let newest = approved.is_none_or(|a| key > a.ordering_key()) && pending.is_none_or(|p| key > p.ordering_key());
		if newest {
			return Evaluation::Rejected {
				record_id: record.id.clone(),
				plan_id: record.plan_id.clone(),
				key,
			};
		}
	}

	Evaluation::Fallback
}

/// Trial evaluation from the account's creation time.
///
/// A window reaching past the representable range ends at [`DateTime::<Utc>::MAX_UTC`].
pub fn trial_state(account_created_at: DateTime<Utc>, policy: &TrialPolicy, now: DateTime<Utc>) -> EntitlementState {
	let trial_end = policy
		.window()
		.and_then(|window| account_created_at.checked_add_signed(window))
		.unwrap_or(DateTime::<Utc>::MAX_UTC);
	if now < trial_end {
		EntitlementState::TrialActive { trial_ends_at: trial_end }
	} else {
		EntitlementState::TrialExpired { trial_ended_at: trial_end }
	}
}

#[cfg(test)]
mod tests;
