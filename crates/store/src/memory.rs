//! In-process document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::filter::matches_all;
use crate::{Document, DocumentStore, Fields, Filter, Result, SetOptions, Snapshot, SnapshotStream, StoreError};

struct Subscriber {
	collection: String,
	filters: Vec<Filter>,
	tx: mpsc::UnboundedSender<Result<Snapshot>>,
}

struct Inner {
	collections: HashMap<String, BTreeMap<String, Fields>>,
	subscribers: Vec<Subscriber>,
	next_id: u64,
	available: bool,
	fail_next: u32,
	writes: u64,
}

impl Default for Inner {
	fn default() -> Self {
		Self {
			collections: HashMap::new(),
			subscribers: Vec::new(),
			next_id: 0,
			available: true,
			fail_next: 0,
			writes: 0,
		}
	}
}

impl Inner {
	fn check(&mut self, op: &str) -> Result<()> {
		if !self.available {
			return Err(StoreError::Unavailable(format!("{op}: store offline")));
		}
		if self.fail_next > 0 {
			self.fail_next -= 1;
			return Err(StoreError::Unavailable(format!("{op}: injected failure")));
		}
		Ok(())
	}

	fn matching(&self, collection: &str, filters: &[Filter]) -> Vec<Document> {
		let Some(docs) = self.collections.get(collection) else {
			return Vec::new();
		};
		docs.iter()
			.map(|(id, fields)| Document::new(id.clone(), fields.clone()))
			.filter(|doc| matches_all(filters, doc))
			.collect()
	}

	/// Sends a fresh snapshot to every live subscriber of `collection`.
	fn publish(&mut self, collection: &str) {
		let mut subscribers = std::mem::take(&mut self.subscribers);
		subscribers.retain(|sub| {
			if sub.collection != collection {
				return !sub.tx.is_closed();
			}
			let documents = self.matching(&sub.collection, &sub.filters);
			sub.tx.send(Ok(Snapshot { documents })).is_ok()
		});
		self.subscribers = subscribers;
	}
}

/// Thread-safe in-memory [`DocumentStore`].
///
/// Cloning yields another handle to the same data. Fault injection hooks make
/// store outages deterministic in tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
	inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for MemoryStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner = self.inner.lock();
		f.debug_struct("MemoryStore")
			.field("collections", &inner.collections.len())
			.field("subscribers", &inner.subscribers.len())
			.field("available", &inner.available)
			.finish()
	}
}

impl MemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Takes the store offline (`false`) or back online (`true`).
	///
	/// Going offline also terminates every open subscription with an error.
	pub fn set_available(&self, available: bool) {
		let mut inner = self.inner.lock();
		inner.available = available;
		if !available {
			for sub in inner.subscribers.drain(..) {
				let _ = sub.tx.send(Err(StoreError::Unavailable("store offline".into())));
			}
		}
	}

	/// Makes the next `n` operations fail with [`StoreError::Unavailable`].
	pub fn fail_next(&self, n: u32) {
		self.inner.lock().fail_next = n;
	}

	/// Terminates every subscription on `collection` with an error.
	pub fn break_subscriptions(&self, collection: &str) {
		let mut inner = self.inner.lock();
		inner.subscribers.retain(|sub| {
			if sub.collection != collection {
				return true;
			}
			let _ = sub.tx.send(Err(StoreError::Unavailable("listener terminated".into())));
			false
		});
	}

	/// Number of successful writes (set, add, delete) so far.
	pub fn writes(&self) -> u64 {
		self.inner.lock().writes
	}

	/// Number of live subscriptions on `collection`.
	pub fn subscriber_count(&self, collection: &str) -> usize {
		let inner = self.inner.lock();
		inner
			.subscribers
			.iter()
			.filter(|sub| sub.collection == collection && !sub.tx.is_closed())
			.count()
	}

	/// Synchronous read that bypasses fault injection, for assertions.
	pub fn peek(&self, collection: &str, id: &str) -> Option<Document> {
		let inner = self.inner.lock();
		inner
			.collections
			.get(collection)
			.and_then(|docs| docs.get(id))
			.map(|fields| Document::new(id, fields.clone()))
	}

	/// Synchronous write that bypasses fault injection, for seeding fixtures.
	pub fn insert(&self, collection: &str, id: &str, fields: Fields) {
		let mut inner = self.inner.lock();
		inner
			.collections
			.entry(collection.to_string())
			.or_default()
			.insert(id.to_string(), fields);
		inner.publish(collection);
	}
}

#[async_trait]
impl DocumentStore for MemoryStore {
	async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
		let mut inner = self.inner.lock();
		inner.check("get_document")?;
		Ok(inner
			.collections
			.get(collection)
			.and_then(|docs| docs.get(id))
			.map(|fields| Document::new(id, fields.clone())))
	}

	async fn set_document(&self, collection: &str, id: &str, fields: Fields, options: SetOptions) -> Result<()> {
		let mut inner = self.inner.lock();
		inner.check("set_document")?;
		let docs = inner.collections.entry(collection.to_string()).or_default();
		match docs.get_mut(id) {
			Some(existing) if options.merge => existing.extend(fields),
			_ => {
				docs.insert(id.to_string(), fields);
			}
		}
		inner.writes += 1;
		inner.publish(collection);
		Ok(())
	}

	async fn add_document(&self, collection: &str, fields: Fields) -> Result<String> {
		let mut inner = self.inner.lock();
		inner.check("add_document")?;
		inner.next_id += 1;
		let id = format!("auto-{:06}", inner.next_id);
		inner
			.collections
			.entry(collection.to_string())
			.or_default()
			.insert(id.clone(), fields);
		inner.writes += 1;
		inner.publish(collection);
		Ok(id)
	}

	async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
		let mut inner = self.inner.lock();
		inner.check("delete_document")?;
		let removed = inner.collections.get_mut(collection).and_then(|docs| docs.remove(id)).is_some();
		inner.writes += 1;
		if removed {
			inner.publish(collection);
		}
		Ok(())
	}

	async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>> {
		let mut inner = self.inner.lock();
		inner.check("query")?;
		Ok(inner.matching(collection, filters))
	}

	async fn subscribe(&self, collection: &str, filters: Vec<Filter>) -> Result<SnapshotStream> {
		let mut inner = self.inner.lock();
		inner.check("subscribe")?;
		let (tx, rx) = mpsc::unbounded_channel();
		let documents = inner.matching(collection, &filters);
		let _ = tx.send(Ok(Snapshot { documents }));
		tracing::trace!(collection, filters = filters.len(), "memory_store.subscribe");
		inner.subscribers.push(Subscriber {
			collection: collection.to_string(),
			filters,
			tx,
		});
		Ok(SnapshotStream::new(rx))
	}
}

#[cfg(test)]
mod tests;
