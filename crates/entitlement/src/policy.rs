//! Read-through cache for the global trial policy document.

use std::time::Duration;

use lyceum_config::{EntitlementConfig, TrialPolicy};
use lyceum_store::{Document, DocumentStore};
use parking_lot::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct CachedPolicy {
	policy: TrialPolicy,
	fetched_at: Instant,
}

/// Last known trial policy with explicit staleness rules.
///
/// * Fresh (younger than the TTL): served without touching the store.
/// * Stale: re-read on the next [`PolicyCache::read_through`]; if that read
///   fails or the document is absent, the stale value is still served.
/// * Never cached: the configured default applies.
///
/// One cache is shared by every watch of a resolver; inject a pre-seeded or
/// empty cache to control outage scenarios.
#[derive(Debug)]
pub struct PolicyCache {
	ttl: Duration,
	default: TrialPolicy,
	entry: RwLock<Option<CachedPolicy>>,
}

impl PolicyCache {
	pub fn new(default: TrialPolicy, ttl: Duration) -> Self {
		Self {
			ttl,
			default,
			entry: RwLock::new(None),
		}
	}

	pub fn from_config(config: &EntitlementConfig) -> Self {
		Self::new(config.default_trial, config.policy_cache_ttl())
	}

	/// Last policy read from the store, however old.
	pub fn last_known(&self) -> Option<TrialPolicy> {
		self.entry.read().map(|cached| cached.policy)
	}

	/// Policy to evaluate with right now, without I/O.
	pub fn current(&self) -> TrialPolicy {
		self.last_known().unwrap_or(self.default)
	}

	pub fn is_fresh(&self) -> bool {
		self.entry.read().is_some_and(|cached| cached.fetched_at.elapsed() < self.ttl)
	}

	/// Records a policy observed from the store.
	pub fn observe(&self, policy: TrialPolicy) {
		*self.entry.write() = Some(CachedPolicy {
			policy,
			fetched_at: Instant::now(),
		});
	}

	/// Parses a policy document and records it. Malformed documents are ignored.
	pub fn observe_document(&self, doc: &Document) -> Option<TrialPolicy> {
		match doc.parse::<TrialPolicy>() {
			Ok(policy) if policy.value > 0 && policy.window().is_some() => {
				self.observe(policy);
				Some(policy)
			}
			Ok(policy) => {
				tracing::warn!(?policy, "ignoring trial policy with unusable window");
				None
			}
			Err(error) => {
				tracing::warn!(%error, "ignoring malformed trial policy document");
				None
			}
		}
	}

	/// Returns the fresh cached policy, or reads it from the store, falling back
	/// to the last known policy and then the default.
	pub async fn read_through<S>(&self, store: &S, collection: &str, id: &str) -> TrialPolicy
	where
		S: DocumentStore + ?Sized,
	{
		if self.is_fresh() {
			return self.current();
		}
		match store.get_document(collection, id).await {
			Ok(Some(doc)) => self.observe_document(&doc).unwrap_or_else(|| self.current()),
			Ok(None) => {
				tracing::debug!(collection, id, "trial policy document absent; using cached or default policy");
				self.current()
			}
			Err(error) => {
				tracing::warn!(%error, "trial policy unreadable; using cached or default policy");
				self.current()
			}
		}
	}
}

#[cfg(test)]
mod tests;
