//! Invitation-link flows: redeem an owner's code as the signed-in dependent.
//!
//! Two entry points race to pair the same dependent: redeeming a code while
//! already signed in, and remembering a code until the first sign-in. Both go
//! through [`PairingService::pair`], so the first observed owner wins.

use std::sync::Arc;

use lyceum_codes::{CodeAllocator, InvitationCode};
use lyceum_primitives::{AccountId, SessionAccount};
use lyceum_store::DocumentStore;
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;

use crate::{Identity, LinkError, PairOutcome, PairingService, SessionEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
	/// Newly linked to `owner`.
	Linked { owner: AccountId },
	/// Was already linked to `owner`; nothing changed.
	AlreadyLinked { owner: AccountId },
	/// Linked to someone else. The session was signed out and the caller must
	/// send the user to re-authentication.
	SignedOut { existing_owner: AccountId },
	/// Nobody is signed in; the code is remembered for the next sign-in.
	Deferred,
}

pub struct InvitationLinker<S> {
	pairing: Arc<PairingService<S>>,
	codes: Arc<CodeAllocator<S>>,
	identity: Arc<dyn Identity>,
	remembered: Mutex<Option<InvitationCode>>,
}

impl<S: DocumentStore> InvitationLinker<S> {
	pub fn new(pairing: Arc<PairingService<S>>, codes: Arc<CodeAllocator<S>>, identity: Arc<dyn Identity>) -> Self {
		Self {
			pairing,
			codes,
			identity,
			remembered: Mutex::new(None),
		}
	}

	/// Direct flow: pairs the signed-in account with the code's owner, or
	/// remembers the code when nobody is signed in.
	pub async fn link_with_code(&self, code: &str) -> Result<LinkOutcome, LinkError> {
		let code = InvitationCode::parse(code)?;
		match self.identity.current() {
			Some(account) => self.link(&account, &code).await,
			None => {
				*self.remembered.lock() = Some(code);
				Ok(LinkOutcome::Deferred)
			}
		}
	}

	/// Deferred flow: keeps `code` until [`on_signed_in`](Self::on_signed_in).
	pub fn remember(&self, code: &str) -> Result<(), LinkError> {
		let code = InvitationCode::parse(code)?;
		tracing::debug!(%code, "invitation code remembered");
		*self.remembered.lock() = Some(code);
		Ok(())
	}

	pub fn remembered(&self) -> Option<InvitationCode> {
		self.remembered.lock().clone()
	}

	/// Consumes the remembered code, if any, for `account`.
	///
	/// A transient failure puts the code back so the next sign-in retries.
	pub async fn on_signed_in(&self, account: &SessionAccount) -> Result<Option<LinkOutcome>, LinkError> {
		let Some(code) = self.remembered.lock().take() else {
			return Ok(None);
		};
		match self.link(account, &code).await {
			Ok(outcome) => Ok(Some(outcome)),
			Err(error) => {
				if error.is_transient() {
					self.remembered.lock().get_or_insert(code);
				}
				Err(error)
			}
		}
	}

	/// Applies [`on_signed_in`](Self::on_signed_in) to every sign-in until the
	/// identity provider goes away.
	pub async fn run(self: Arc<Self>) {
		let mut events = self.identity.events();
		loop {
			match events.recv().await {
				Ok(SessionEvent::SignedIn(account)) => match self.on_signed_in(&account).await {
					Ok(Some(outcome)) => tracing::debug!(account = %account.id, ?outcome, "deferred invitation applied"),
					Ok(None) => {}
					Err(error) => tracing::warn!(account = %account.id, %error, "deferred invitation failed"),
				},
				Ok(SessionEvent::SignedOut) => {}
				Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "session events lagged"),
				Err(RecvError::Closed) => break,
			}
		}
	}

	async fn link(&self, account: &SessionAccount, code: &InvitationCode) -> Result<LinkOutcome, LinkError> {
		let Some(owner) = self.codes.lookup(code).await? else {
			return Err(LinkError::UnknownCode(code.to_string()));
		};
		if owner == account.id {
			return Err(LinkError::SelfLink(owner));
		}

		match self.pairing.pair(&account.id, &owner).await? {
			PairOutcome::Linked => Ok(LinkOutcome::Linked { owner }),
			PairOutcome::AlreadyLinkedToSame => Ok(LinkOutcome::AlreadyLinked { owner }),
			PairOutcome::AlreadyLinkedToOther(existing_owner) => {
				tracing::warn!(account = %account.id, %existing_owner, requested = %owner, "signing out after pairing conflict");
				self.identity.sign_out().await;
				Ok(LinkOutcome::SignedOut { existing_owner })
			}
		}
	}
}
