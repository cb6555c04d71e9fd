//! Session/identity provider contract.

use async_trait::async_trait;
use lyceum_primitives::SessionAccount;
use parking_lot::RwLock;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	SignedIn(SessionAccount),
	SignedOut,
}

/// Supplies the signed-in account and announces sign-in/sign-out.
#[async_trait]
pub trait Identity: Send + Sync + 'static {
	/// The signed-in account, if any.
	fn current(&self) -> Option<SessionAccount>;

	/// Ends the current session.
	async fn sign_out(&self);

	/// Session changes from now on.
	fn events(&self) -> broadcast::Receiver<SessionEvent>;
}

/// In-process session holder.
#[derive(Debug)]
pub struct LocalIdentity {
	current: RwLock<Option<SessionAccount>>,
	events: broadcast::Sender<SessionEvent>,
}

impl Default for LocalIdentity {
	fn default() -> Self {
		Self::new()
	}
}

impl LocalIdentity {
	pub fn new() -> Self {
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		Self {
			current: RwLock::new(None),
			events,
		}
	}

	pub fn sign_in(&self, account: SessionAccount) {
		tracing::debug!(account = %account.id, "session.signed_in");
		*self.current.write() = Some(account.clone());
		let _ = self.events.send(SessionEvent::SignedIn(account));
	}
}

#[async_trait]
impl Identity for LocalIdentity {
	fn current(&self) -> Option<SessionAccount> {
		self.current.read().clone()
	}

	async fn sign_out(&self) {
		if self.current.write().take().is_some() {
			tracing::debug!("session.signed_out");
			let _ = self.events.send(SessionEvent::SignedOut);
		}
	}

	fn events(&self) -> broadcast::Receiver<SessionEvent> {
		self.events.subscribe()
	}
}
