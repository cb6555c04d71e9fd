use lyceum_primitives::SessionAccount;
use lyceum_store::DocumentStore;

use crate::{Access, EntitlementResolver, EntitlementState, EntitlementWatch};

/// Keeps exactly one entitlement watch for whichever account is signed in.
///
/// Switching accounts (or signing out) drops the previous watch before the
/// next one starts, so timers of the old account can no longer publish.
pub struct AccountEntitlements<S> {
	resolver: EntitlementResolver<S>,
	watch: Option<EntitlementWatch>,
}

impl<S: DocumentStore> AccountEntitlements<S> {
	pub fn new(resolver: EntitlementResolver<S>) -> Self {
		Self { resolver, watch: None }
	}

	/// Points the watch at `account`; `None` tears it down.
	pub fn follow(&mut self, account: Option<&SessionAccount>) -> Option<&mut EntitlementWatch> {
		let unchanged = match (&self.watch, account) {
			(Some(watch), Some(account)) => *watch.account() == account.id,
			(None, None) => true,
			_ => false,
		};
		if !unchanged {
			if let Some(previous) = self.watch.take() {
				tracing::debug!(account = %previous.account(), "entitlement watch replaced");
			}
			self.watch = account.map(|account| self.resolver.subscribe(account));
		}
		self.watch.as_mut()
	}

	pub fn watch(&mut self) -> Option<&mut EntitlementWatch> {
		self.watch.as_mut()
	}

	pub fn current(&self) -> Option<EntitlementState> {
		self.watch.as_ref().and_then(EntitlementWatch::current)
	}

	/// Gating for the signed-in account; locked when nobody is signed in.
	pub fn access(&self) -> Access {
		self.watch.as_ref().map_or(Access::Locked, EntitlementWatch::access)
	}
}
