//! Query filters.

use serde_json::Value;

use crate::Document;

/// One equality constraint. A query matches documents satisfying all of its filters.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
	/// Field equals value. `null` or absent fields never match.
	Eq(String, Value),
	/// Document id equals value.
	Id(String),
}

impl Filter {
	/// Shorthand for [`Filter::Eq`].
	pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
		Self::Eq(field.into(), value.into())
	}

	/// Shorthand for [`Filter::Id`].
	pub fn id(id: impl Into<String>) -> Self {
		Self::Id(id.into())
	}

	/// Returns true when `doc` satisfies this filter.
	pub fn matches(&self, doc: &Document) -> bool {
		match self {
			Self::Eq(field, value) => doc.get(field) == Some(value),
			Self::Id(id) => doc.id == *id,
		}
	}
}

/// Returns true when `doc` satisfies every filter.
pub fn matches_all(filters: &[Filter], doc: &Document) -> bool {
	filters.iter().all(|f| f.matches(doc))
}
