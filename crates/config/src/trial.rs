//! Trial policy document shape.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Unit of a trial window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialUnit {
	Days,
	Minutes,
}

/// Global trial policy: how long after account creation paid features stay unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialPolicy {
	pub unit: TrialUnit,
	pub value: u32,
}

impl TrialPolicy {
	pub const fn new(unit: TrialUnit, value: u32) -> Self {
		Self { unit, value }
	}

	/// Length of the trial window, or `None` when it does not fit in a [`TimeDelta`].
	pub fn window(&self) -> Option<TimeDelta> {
		let value = i64::from(self.value);
		match self.unit {
			TrialUnit::Days => TimeDelta::try_days(value),
			TrialUnit::Minutes => TimeDelta::try_minutes(value),
		}
	}
}
