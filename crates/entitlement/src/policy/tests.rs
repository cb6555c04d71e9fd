use lyceum_config::TrialUnit;
use lyceum_store::{Fields, MemoryStore};
use serde_json::json;

use super::*;

const DEFAULT: TrialPolicy = TrialPolicy::new(TrialUnit::Days, 7);

fn policy_fields(unit: &str, value: u32) -> Fields {
	json!({ "unit": unit, "value": value }).as_object().cloned().unwrap()
}

#[tokio::test]
async fn unreadable_and_never_cached_uses_default() {
	let store = MemoryStore::new();
	store.set_available(false);
	let cache = PolicyCache::new(DEFAULT, Duration::from_secs(60));
	assert_eq!(cache.read_through(&store, "settings", "trial").await, DEFAULT);
	assert_eq!(cache.last_known(), None);
}

#[tokio::test]
async fn absent_document_uses_default() {
	let store = MemoryStore::new();
	let cache = PolicyCache::new(DEFAULT, Duration::from_secs(60));
	assert_eq!(cache.read_through(&store, "settings", "trial").await, DEFAULT);
}

#[tokio::test(start_paused = true)]
async fn stale_entry_survives_outage() {
	let store = MemoryStore::new();
	store.insert("settings", "trial", policy_fields("minutes", 30));
	let cache = PolicyCache::new(DEFAULT, Duration::from_secs(60));

	let minutes = TrialPolicy::new(TrialUnit::Minutes, 30);
	assert_eq!(cache.read_through(&store, "settings", "trial").await, minutes);
	assert!(cache.is_fresh());

	tokio::time::advance(Duration::from_secs(61)).await;
	assert!(!cache.is_fresh());
	store.set_available(false);
	assert_eq!(cache.read_through(&store, "settings", "trial").await, minutes);
}

#[tokio::test(start_paused = true)]
async fn fresh_entry_skips_the_store() {
	let store = MemoryStore::new();
	store.insert("settings", "trial", policy_fields("days", 3));
	let cache = PolicyCache::new(DEFAULT, Duration::from_secs(60));
	let _ = cache.read_through(&store, "settings", "trial").await;

	store.insert("settings", "trial", policy_fields("days", 1));
	assert_eq!(cache.read_through(&store, "settings", "trial").await, TrialPolicy::new(TrialUnit::Days, 3));

	tokio::time::advance(Duration::from_secs(60)).await;
	assert_eq!(cache.read_through(&store, "settings", "trial").await, TrialPolicy::new(TrialUnit::Days, 1));
}

#[tokio::test(start_paused = true)]
async fn malformed_document_keeps_previous_policy() {
	let store = MemoryStore::new();
	store.insert("settings", "trial", json!({ "unit": "fortnights", "value": 1 }).as_object().cloned().unwrap());
	let cache = PolicyCache::new(DEFAULT, Duration::from_secs(60));
	cache.observe(TrialPolicy::new(TrialUnit::Minutes, 5));
	tokio::time::advance(Duration::from_secs(120)).await;

	assert_eq!(cache.read_through(&store, "settings", "trial").await, TrialPolicy::new(TrialUnit::Minutes, 5));
}

#[test]
fn zero_window_is_ignored() {
	let cache = PolicyCache::new(DEFAULT, Duration::from_secs(60));
	let doc = Document::new("trial", policy_fields("days", 0));
	assert_eq!(cache.observe_document(&doc), None);
	assert_eq!(cache.current(), DEFAULT);
}
