//! Document store client contract.
//!
//! The consistency layer talks to a remote, schemaless document database
//! through [`DocumentStore`]. The contract offers per-document reads and
//! writes, filtered queries and change-stream subscriptions that deliver the
//! full matching set on every change. No multi-document transactions exist.
//!
//! [`MemoryStore`] is an in-process implementation with fault injection, used
//! by tests and by offline tooling.

#![warn(missing_docs)]

pub mod document;
pub mod error;
pub mod filter;
pub mod memory;
pub mod stream;

use async_trait::async_trait;

pub use document::{Document, Fields, SetOptions};
pub use error::{Result, StoreError};
pub use filter::Filter;
pub use memory::MemoryStore;
pub use stream::{Snapshot, SnapshotStream};

/// Remote document database as seen by the client.
///
/// Every operation may fail with [`StoreError::Unavailable`]; callers decide
/// whether to fall back to cached state or surface the failure.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
	/// Reads one document. `Ok(None)` when it does not exist.
	async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;

	/// Writes one document. With `merge`, only the given top-level fields are replaced.
	async fn set_document(&self, collection: &str, id: &str, fields: Fields, options: SetOptions) -> Result<()>;

	/// Creates a document with a store-assigned id and returns that id.
	async fn add_document(&self, collection: &str, fields: Fields) -> Result<String>;

	/// Deletes one document. Deleting a missing document succeeds.
	async fn delete_document(&self, collection: &str, id: &str) -> Result<()>;

	/// Returns every document in `collection` matching all `filters`.
	async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>>;

	/// Opens a change stream over the documents matching all `filters`.
	///
	/// The stream yields the full current set first and again after every
	/// change. Snapshots for one stream are delivered serially.
	async fn subscribe(&self, collection: &str, filters: Vec<Filter>) -> Result<SnapshotStream>;
}
