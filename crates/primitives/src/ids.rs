use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque account identifier assigned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_inner(self) -> String {
		self.0
	}
}

impl fmt::Display for AccountId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for AccountId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

impl From<String> for AccountId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl AsRef<str> for AccountId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
