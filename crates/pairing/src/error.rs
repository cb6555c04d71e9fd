use lyceum_codes::CodeError;
use lyceum_primitives::AccountId;
use lyceum_store::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairError {
	#[error(transparent)]
	Store(#[from] StoreError),

	/// The dependent has no account document and is not the signed-in
	/// account, so there is nothing to create it from.
	#[error("no account document for {0} and no matching session to create it from")]
	NoSessionProfile(AccountId),
}

pub type Result<T> = std::result::Result<T, PairError>;

/// Failures of the course/enrollment collaborator. Always best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
	#[error("catalog unavailable: {0}")]
	Unavailable(String),
	#[error("unknown offering {0}")]
	UnknownOffering(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
	#[error(transparent)]
	Code(#[from] CodeError),

	#[error(transparent)]
	Pair(#[from] PairError),

	/// Well-formed code that no owner holds.
	#[error("invitation code {0} is not assigned to anyone")]
	UnknownCode(String),

	/// An owner tried to redeem its own code.
	#[error("account {0} cannot link to itself")]
	SelfLink(AccountId),
}

impl LinkError {
	/// True when retrying later may succeed.
	pub fn is_transient(&self) -> bool {
		matches!(
			self,
			Self::Code(CodeError::Store(_) | CodeError::ExhaustedRetries { .. }) | Self::Pair(PairError::Store(_))
		)
	}
}
