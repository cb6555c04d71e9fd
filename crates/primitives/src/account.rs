use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// What the session provider knows about the currently authenticated account.
///
/// Used both as the input to entitlement resolution (trial windows start at
/// `created_at`) and as the seed for idempotently creating an account document
/// that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAccount {
	pub id: AccountId,
	#[serde(default)]
	pub display_name: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(with = "crate::timestamp")]
	pub created_at: DateTime<Utc>,
}

impl SessionAccount {
	pub fn new(id: impl Into<AccountId>, created_at: DateTime<Utc>) -> Self {
		Self {
			id: id.into(),
			display_name: None,
			email: None,
			created_at,
		}
	}

	#[must_use]
	pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
		self.display_name = Some(name.into());
		self
	}

	#[must_use]
	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());
		self
	}
}
