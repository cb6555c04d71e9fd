use std::sync::Arc;
use std::time::Duration;

use lyceum_config::Config;
use lyceum_primitives::{AccountId, Clock, SessionAccount, SystemClock};
use lyceum_store::DocumentStore;
use lyceum_worker::{GenerationClock, GenerationToken, TaskClass, spawn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{Access, EntitlementCache, EntitlementState, PolicyCache};

mod watch_task;

use watch_task::WatchTask;

/// Collection names and timings used by a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
	pub payments: String,
	pub settings: String,
	pub trial_policy: String,
	/// How long a recent rejection stays visible.
	pub rejection_visibility: Duration,
	/// Delay before re-subscribing after a stream error.
	pub resubscribe_backoff: Duration,
}

impl ResolverSettings {
	pub fn from_config(config: &Config) -> Self {
		Self {
			payments: config.collections.payments.clone(),
			settings: config.collections.settings.clone(),
			trial_policy: config.collections.trial_policy.clone(),
			rejection_visibility: config.entitlement.rejection_visibility(),
			resubscribe_backoff: config.entitlement.resubscribe_backoff(),
		}
	}
}

pub(crate) type ChangeListener = Box<dyn FnMut(&EntitlementState) + Send + 'static>;

/// Derives an [`EntitlementState`] per watched account.
///
/// Each [`subscribe`](Self::subscribe) call spawns one watch loop owning the
/// payment subscription, the policy subscription and the rejection/deadline
/// timers for that account. All of it is torn down when the returned
/// [`EntitlementWatch`] is dropped.
pub struct EntitlementResolver<S> {
	store: Arc<S>,
	clock: Arc<dyn Clock>,
	policy: Arc<PolicyCache>,
	cache: Arc<EntitlementCache>,
	settings: ResolverSettings,
	generations: GenerationClock,
}

impl<S> Clone for EntitlementResolver<S> {
	fn clone(&self) -> Self {
		Self {
			store: Arc::clone(&self.store),
			clock: Arc::clone(&self.clock),
			policy: Arc::clone(&self.policy),
			cache: Arc::clone(&self.cache),
			settings: self.settings.clone(),
			generations: self.generations.clone(),
		}
	}
}

impl<S: DocumentStore> EntitlementResolver<S> {
	/// Creates a resolver on the system clock with empty caches.
	pub fn new(store: Arc<S>, config: &Config) -> Self {
		Self {
			store,
			clock: Arc::new(SystemClock),
			policy: Arc::new(PolicyCache::from_config(&config.entitlement)),
			cache: Arc::new(EntitlementCache::new()),
			settings: ResolverSettings::from_config(config),
			generations: GenerationClock::new(),
		}
	}

	#[must_use]
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	#[must_use]
	pub fn with_policy_cache(mut self, policy: Arc<PolicyCache>) -> Self {
		self.policy = policy;
		self
	}

	#[must_use]
	pub fn with_entitlement_cache(mut self, cache: Arc<EntitlementCache>) -> Self {
		self.cache = cache;
		self
	}

	pub fn policy_cache(&self) -> &Arc<PolicyCache> {
		&self.policy
	}

	pub fn entitlement_cache(&self) -> &Arc<EntitlementCache> {
		&self.cache
	}

	/// Starts watching `account`.
	pub fn subscribe(&self, account: &SessionAccount) -> EntitlementWatch {
		self.spawn_watch(account, None)
	}

	/// Starts watching `account`, calling `on_change` from the watch loop with
	/// the seeded state (if any) and then after every change.
	pub fn subscribe_with<F>(&self, account: &SessionAccount, on_change: F) -> EntitlementWatch
	where
		F: FnMut(&EntitlementState) + Send + 'static,
	{
		self.spawn_watch(account, Some(Box::new(on_change)))
	}

	fn spawn_watch(&self, account: &SessionAccount, on_change: Option<ChangeListener>) -> EntitlementWatch {
		let token = self.generations.token();
		let (state_tx, rx) = watch::channel(self.cache.get(&account.id));
		let marks = self.cache.marks(&account.id);
		let (timer_tx, timer_rx) = mpsc::unbounded_channel();

		tracing::debug!(account = %account.id, generation = token.generation(), "entitlement.watch.start");

		let task = WatchTask {
			store: Arc::clone(&self.store),
			clock: Arc::clone(&self.clock),
			policy: Arc::clone(&self.policy),
			cache: Arc::clone(&self.cache),
			settings: self.settings.clone(),
			account: account.clone(),
			token: token.clone(),
			state_tx,
			on_change,
			timer_tx,
			timer_rx,
			timer_generations: GenerationClock::new(),
			records: Vec::new(),
			resolved: false,
			banner: None,
			dismissed: marks.dismissed,
			restored: marks.shown,
			deadline: None,
		};
		let handle = spawn(TaskClass::Interactive, task.run());

		EntitlementWatch {
			account: account.id.clone(),
			token,
			rx,
			handle: Some(handle),
		}
	}
}

/// Handle to one account's live entitlement.
///
/// Reads are synchronous. Dropping the handle (or calling
/// [`unsubscribe`](Self::unsubscribe)) cancels the watch loop, its store
/// subscriptions and every pending timer.
#[derive(Debug)]
pub struct EntitlementWatch {
	account: AccountId,
	token: GenerationToken,
	rx: watch::Receiver<Option<EntitlementState>>,
	handle: Option<JoinHandle<()>>,
}

impl EntitlementWatch {
	pub fn account(&self) -> &AccountId {
		&self.account
	}

	/// Resolver-wide generation of this watch.
	pub fn generation(&self) -> u64 {
		self.token.generation()
	}

	/// Latest state, `None` until the first resolution (or a cached seed).
	pub fn current(&self) -> Option<EntitlementState> {
		self.rx.borrow().clone()
	}

	pub fn access(&self) -> Access {
		Access::of(self.rx.borrow().as_ref())
	}

	/// Waits for the next change. `None` once the watch loop has stopped.
	pub async fn changed(&mut self) -> Option<EntitlementState> {
		self.rx.changed().await.ok()?;
		self.current()
	}

	/// Waits until the state satisfies `predicate`, returning that state.
	pub async fn wait_until<P>(&mut self, mut predicate: P) -> Option<EntitlementState>
	where
		P: FnMut(&EntitlementState) -> bool,
	{
		let state = self.rx.wait_for(|state| state.as_ref().is_some_and(&mut predicate)).await.ok()?;
		(*state).clone()
	}

	pub fn unsubscribe(self) {}

	/// Cancels the watch and waits for its loop to exit.
	pub async fn shutdown(mut self) {
		self.token.cancel();
		if let Some(handle) = self.handle.take()
			&& let Err(err) = handle.await
			&& let Some(msg) = lyceum_worker::join_error_panic_message(err)
		{
			tracing::error!(account = %self.account, panic = %msg, "entitlement watch panicked");
		}
	}
}

impl Drop for EntitlementWatch {
	fn drop(&mut self) {
		self.token.cancel();
	}
}
