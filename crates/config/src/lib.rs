//! Configuration for the entitlement, pairing and invitation-code services.
//!
//! Configuration is written in TOML. Every field has a default, so an empty
//! file (or no file at all) yields a working configuration:
//!
//! ```toml
//! [collections]
//! accounts = "users"
//! payments = "payments"
//! settings = "settings"
//! trial_policy = "trial"
//! links = "teacherStudents"
//! codes = "invitationCodes"
//!
//! [entitlement]
//! rejection_visibility_secs = 300
//! policy_cache_ttl_secs = 600
//! resubscribe_backoff_ms = 2000
//! default_trial = { unit = "days", value = 7 }
//!
//! [codes]
//! max_draws = 32
//! max_store_failures = 3
//! recent_issued = 256
//! ```

pub mod error;
pub mod trial;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use error::{ConfigError, Result};
pub use trial::{TrialPolicy, TrialUnit};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub collections: Collections,
	pub entitlement: EntitlementConfig,
	pub codes: CodesConfig,
}

/// Names of the store collections (and well-known documents) this layer touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Collections {
	/// Account documents; dependents carry their owner field here.
	pub accounts: String,
	/// Payment records, one document per submission.
	pub payments: String,
	/// Global settings documents.
	pub settings: String,
	/// Id of the trial policy document inside `settings`.
	pub trial_policy: String,
	/// Legacy owner/dependent link documents.
	pub links: String,
	/// Invitation code lookup documents, keyed by the code.
	pub codes: String,
}

impl Default for Collections {
	fn default() -> Self {
		Self {
			accounts: "users".into(),
			payments: "payments".into(),
			settings: "settings".into(),
			trial_policy: "trial".into(),
			links: "teacherStudents".into(),
			codes: "invitationCodes".into(),
		}
	}
}

/// Entitlement resolver tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntitlementConfig {
	/// How long a recent rejection stays visible before falling back to trial evaluation.
	pub rejection_visibility_secs: u64,
	/// Age after which a cached trial policy is re-read from the store.
	pub policy_cache_ttl_secs: u64,
	/// Delay before re-subscribing after a payment stream error.
	pub resubscribe_backoff_ms: u64,
	/// Trial policy used when the policy document was never readable.
	pub default_trial: TrialPolicy,
}

impl Default for EntitlementConfig {
	fn default() -> Self {
		Self {
			rejection_visibility_secs: 5 * 60,
			policy_cache_ttl_secs: 10 * 60,
			resubscribe_backoff_ms: 2_000,
			default_trial: TrialPolicy::new(TrialUnit::Days, 7),
		}
	}
}

impl EntitlementConfig {
	pub fn rejection_visibility(&self) -> Duration {
		Duration::from_secs(self.rejection_visibility_secs)
	}

	pub fn policy_cache_ttl(&self) -> Duration {
		Duration::from_secs(self.policy_cache_ttl_secs)
	}

	pub fn resubscribe_backoff(&self) -> Duration {
		Duration::from_millis(self.resubscribe_backoff_ms)
	}
}

/// Invitation code allocator bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodesConfig {
	/// Maximum draws (collisions included) before allocation gives up.
	pub max_draws: u32,
	/// Maximum consecutive store failures before allocation gives up.
	pub max_store_failures: u32,
	/// How many freshly allocated, not yet reserved codes one allocator
	/// remembers to avoid handing them out twice. Zero disables it.
	pub recent_issued: u32,
}

impl Default for CodesConfig {
	fn default() -> Self {
		Self {
			max_draws: 32,
			max_store_failures: 3,
			recent_issued: 256,
		}
	}
}

impl Config {
	/// Reads and validates a configuration file.
	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	/// Parses and validates configuration text.
	pub fn from_toml_str(text: &str) -> Result<Self> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	/// Rejects values that parse but cannot work.
	pub fn validate(&self) -> Result<()> {
		let c = &self.collections;
		let names = [
			("collections.accounts", &c.accounts),
			("collections.payments", &c.payments),
			("collections.settings", &c.settings),
			("collections.trial_policy", &c.trial_policy),
			("collections.links", &c.links),
			("collections.codes", &c.codes),
		];
		if let Some((key, _)) = names.iter().find(|(_, name)| name.trim().is_empty()) {
			return Err(ConfigError::Invalid(format!("{key} must not be empty")));
		}
		if self.entitlement.default_trial.value == 0 {
			return Err(ConfigError::Invalid("entitlement.default_trial.value must be positive".into()));
		}
		if self.codes.max_draws == 0 || self.codes.max_store_failures == 0 {
			return Err(ConfigError::Invalid("codes bounds must be positive".into()));
		}
		Ok(())
	}
}
