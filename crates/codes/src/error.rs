use lyceum_store::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
	/// The code does not have the six-character alphanumeric shape.
	#[error("invalid invitation code {0:?}: expected 6 characters from A-Z and 0-9")]
	Validation(String),

	/// Allocation gave up after too many collisions or store failures.
	#[error("no free invitation code after {attempts} attempts")]
	ExhaustedRetries { attempts: u32 },

	#[error(transparent)]
	Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, CodeError>;
