//! Documents and write options.

use chrono::{DateTime, Utc};
use lyceum_primitives::timestamp;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Result, StoreError};

/// Top-level fields of a document.
pub type Fields = serde_json::Map<String, Value>;

/// One stored document: a store-assigned id plus loosely typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
	/// Document id, unique within its collection.
	pub id: String,
	/// Field values. A `null` value is treated the same as an absent field.
	pub fields: Fields,
}

impl Document {
	/// Creates a document from its id and fields.
	pub fn new(id: impl Into<String>, fields: Fields) -> Self {
		Self { id: id.into(), fields }
	}

	/// Returns a field value, treating `null` as absent.
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.fields.get(field).filter(|v| !v.is_null())
	}

	/// Returns a string field.
	pub fn str(&self, field: &str) -> Option<&str> {
		self.get(field).and_then(Value::as_str)
	}

	/// Returns a timestamp field in any accepted stored shape.
	pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
		self.get(field).and_then(timestamp::decode)
	}

	/// Deserializes the fields into a typed view.
	pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
		serde_json::from_value(Value::Object(self.fields.clone())).map_err(|e| StoreError::Malformed {
			id: self.id.clone(),
			reason: e.to_string(),
		})
	}
}

/// Options for [`DocumentStore::set_document`](crate::DocumentStore::set_document).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
	/// Merge into an existing document instead of replacing it.
	pub merge: bool,
}

impl SetOptions {
	/// Replace the whole document.
	pub const REPLACE: Self = Self { merge: false };
	/// Merge the given top-level fields into the existing document.
	pub const MERGE: Self = Self { merge: true };
}
