//! Store error taxonomy.

use thiserror::Error;

/// Errors surfaced by a [`DocumentStore`](crate::DocumentStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	/// Network or backend failure. Transient from the client's point of view.
	#[error("store unavailable: {0}")]
	Unavailable(String),

	/// A document exists but does not have the expected shape.
	#[error("malformed document {id}: {reason}")]
	Malformed {
		/// Document id.
		id: String,
		/// What failed to parse.
		reason: String,
	},
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
