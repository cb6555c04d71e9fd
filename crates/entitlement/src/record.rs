//! Payment records as parsed at the store boundary.

use chrono::{DateTime, Utc};
use lyceum_primitives::{AccountId, timestamp};
use lyceum_store::{Document, Result};
use serde::Deserialize;

/// Field holding the paying account on a payment document.
pub const OWNER_FIELD: &str = "ownerId";

/// Review status of one payment attempt, with the timestamps valid for that status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
	Pending,
	Approved {
		approved_at: Option<DateTime<Utc>>,
		/// `None` means approved with no expiry enforced.
		expires_at: Option<DateTime<Utc>>,
	},
	Rejected {
		cancelled_at: Option<DateTime<Utc>>,
	},
}

/// One subscription payment attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
	pub id: String,
	pub owner_id: AccountId,
	pub plan_id: String,
	pub amount: f64,
	pub currency: String,
	pub created_at: DateTime<Utc>,
	pub status: PaymentStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawStatus {
	Pending,
	Approved,
	Rejected,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPaymentRecord {
	owner_id: AccountId,
	plan_id: String,
	#[serde(default)]
	amount: f64,
	#[serde(default)]
	currency: String,
	status: RawStatus,
	#[serde(default, with = "timestamp::option")]
	created_at: Option<DateTime<Utc>>,
	#[serde(default, with = "timestamp::option")]
	approved_at: Option<DateTime<Utc>>,
	#[serde(default, with = "timestamp::option")]
	cancelled_at: Option<DateTime<Utc>>,
	#[serde(default, with = "timestamp::option")]
	expires_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
	/// Parses and validates a payment document.
	///
	/// A record whose `createdAt` has not been resolved yet (a submission still
	/// in flight) is stamped with `observed_at`. Timestamps that do not belong
	/// to the record's status are dropped.
	pub fn from_document(doc: &Document, observed_at: DateTime<Utc>) -> Result<Self> {
		let raw: RawPaymentRecord = doc.parse()?;
		let status = match raw.status {
			RawStatus::Pending => PaymentStatus::Pending,
			RawStatus::Approved => PaymentStatus::Approved {
				approved_at: raw.approved_at,
				expires_at: raw.expires_at,
			},
			RawStatus::Rejected => PaymentStatus::Rejected {
				cancelled_at: raw.cancelled_at,
			},
		};
		Ok(Self {
			id: doc.id.clone(),
			owner_id: raw.owner_id,
			plan_id: raw.plan_id,
			amount: raw.amount,
			currency: raw.currency,
			created_at: raw.created_at.unwrap_or(observed_at),
			status,
		})
	}

	/// Timestamp used to order this record against others in the same snapshot.
	///
	/// Approvals order by `approvedAt`, rejections by `cancelledAt`, each falling
	/// back to `createdAt` when the status timestamp is missing.
	pub fn ordering_key(&self) -> DateTime<Utc> {
		match self.status {
			PaymentStatus::Pending => self.created_at,
			PaymentStatus::Approved { approved_at, .. } => approved_at.unwrap_or(self.created_at),
			PaymentStatus::Rejected { cancelled_at } => cancelled_at.unwrap_or(self.created_at),
		}
	}

	pub fn is_pending(&self) -> bool {
		matches!(self.status, PaymentStatus::Pending)
	}
}
