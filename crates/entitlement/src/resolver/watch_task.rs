//! Per-account watch loop.
//!
//! Payment snapshots, policy snapshots and timer deliveries are handled one at
//! a time on this loop, so the state below needs no locking. Each event
//! triggers a full recompute against the latest view of the other inputs.
//!
//! Only field borrows are held across awaits: the change listener is `Send`
//! but not `Sync`.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use lyceum_primitives::{Clock, SessionAccount};
use lyceum_store::{DocumentStore, Filter, Snapshot, SnapshotStream};
use lyceum_worker::{Fired, GenerationClock, GenerationToken, TaskClass, schedule_after};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::{ChangeListener, ResolverSettings};
use crate::evaluate::{Evaluation, evaluate, trial_state};
use crate::record::{OWNER_FIELD, PaymentRecord};
use crate::cache::{RejectionMark, RejectionMarks};
use crate::{EntitlementCache, EntitlementState, PolicyCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TimerKind {
	/// The visible rejection has been shown long enough.
	Banner,
	/// The current state reached its natural end (trial end, approval expiry).
	Deadline,
}

pub(super) struct Banner {
	mark: RejectionMark,
	visible_until: DateTime<Utc>,
	token: GenerationToken,
}

pub(super) struct Deadline {
	at: DateTime<Utc>,
	token: GenerationToken,
}

pub(super) struct WatchTask<S> {
	pub(super) store: Arc<S>,
	pub(super) clock: Arc<dyn Clock>,
	pub(super) policy: Arc<PolicyCache>,
	pub(super) cache: Arc<EntitlementCache>,
	pub(super) settings: ResolverSettings,
	pub(super) account: SessionAccount,
	pub(super) token: GenerationToken,
	pub(super) state_tx: watch::Sender<Option<EntitlementState>>,
	pub(super) on_change: Option<ChangeListener>,
	pub(super) timer_tx: mpsc::UnboundedSender<Fired<TimerKind>>,
	pub(super) timer_rx: mpsc::UnboundedReceiver<Fired<TimerKind>>,
	pub(super) timer_generations: GenerationClock,
	/// Latest parsed payment snapshot.
	pub(super) records: Vec<PaymentRecord>,
	/// Whether at least one payment snapshot has arrived.
	pub(super) resolved: bool,
	pub(super) banner: Option<Banner>,
	/// Rejection whose banner already expired; it must not resurface.
	pub(super) dismissed: Option<RejectionMark>,
	/// Banner left running by an earlier watch on this account.
	pub(super) restored: Option<(RejectionMark, DateTime<Utc>)>,
	pub(super) deadline: Option<Deadline>,
}

async fn next_snapshot(stream: &mut Option<SnapshotStream>) -> Option<lyceum_store::Result<Snapshot>> {
	match stream {
		Some(stream) => stream.next().await,
		None => std::future::pending().await,
	}
}

async fn sleep_until(at: Option<Instant>) {
	match at {
		Some(at) => tokio::time::sleep_until(at).await,
		None => std::future::pending().await,
	}
}

impl<S: DocumentStore> WatchTask<S> {
	pub(super) async fn run(mut self) {
		if let (Some(listener), Some(seed)) = (self.on_change.as_mut(), self.state_tx.borrow().as_ref()) {
			listener(seed);
		}

		self.policy
			.read_through(&*self.store, &self.settings.settings, &self.settings.trial_policy)
			.await;
		let mut payments = Self::open_payments(&self.store, &self.settings, &self.account).await;
		let mut policy = Self::open_policy(&self.store, &self.settings).await;
		let mut retry_at = None;

		loop {
			if payments.is_none() || policy.is_none() {
				retry_at.get_or_insert_with(|| Instant::now() + self.settings.resubscribe_backoff);
			} else {
				retry_at = None;
			}

			tokio::select! {
				biased;
				() = self.token.cancelled() => break,
				Some(fired) = self.timer_rx.recv() => self.on_timer(fired),
				item = next_snapshot(&mut payments) => match item {
					Some(Ok(snapshot)) => self.on_payments(snapshot),
					Some(Err(error)) => {
						tracing::warn!(account = %self.account.id, %error, "payment subscription failed; keeping last known state");
						payments = None;
					}
					None => {
						tracing::debug!(account = %self.account.id, "payment subscription ended");
						payments = None;
					}
				},
				item = next_snapshot(&mut policy) => match item {
					Some(Ok(snapshot)) => self.on_policy(snapshot),
					Some(Err(error)) => {
						tracing::warn!(%error, "trial policy subscription failed; keeping cached policy");
						policy = None;
					}
					None => policy = None,
				},
				() = sleep_until(retry_at) => {
					retry_at = None;
					if payments.is_none() {
						payments = Self::open_payments(&self.store, &self.settings, &self.account).await;
					}
					if policy.is_none() {
						policy = Self::open_policy(&self.store, &self.settings).await;
					}
				}
			}
		}

		self.clear_banner();
		self.arm_deadline(None);
		tracing::debug!(account = %self.account.id, generation = self.token.generation(), "entitlement.watch.stop");
	}

	async fn open_payments(store: &S, settings: &ResolverSettings, account: &SessionAccount) -> Option<SnapshotStream> {
		let filters = vec![Filter::eq(OWNER_FIELD, account.id.as_str())];
		match store.subscribe(&settings.payments, filters).await {
			Ok(stream) => Some(stream),
			Err(error) => {
				tracing::warn!(account = %account.id, %error, "cannot subscribe to payments; keeping last known state");
				None
			}
		}
	}

	async fn open_policy(store: &S, settings: &ResolverSettings) -> Option<SnapshotStream> {
		let filters = vec![Filter::id(settings.trial_policy.as_str())];
		match store.subscribe(&settings.settings, filters).await {
			Ok(stream) => Some(stream),
			Err(error) => {
				tracing::debug!(%error, "cannot subscribe to trial policy; using cached policy");
				None
			}
		}
	}

	fn on_payments(&mut self, snapshot: Snapshot) {
		let observed_at = self.clock.now();
		let mut records = Vec::with_capacity(snapshot.documents.len());
		for doc in &snapshot.documents {
			match PaymentRecord::from_document(doc, observed_at) {
				Ok(record) if record.owner_id == self.account.id => records.push(record),
				Ok(record) => {
					tracing::debug!(record = %doc.id, owner = %record.owner_id, "skipping payment record of another account");
				}
				Err(error) => tracing::debug!(record = %doc.id, %error, "skipping malformed payment record"),
			}
		}
		self.records = records;
		self.resolved = true;
		self.recompute();
	}

	fn on_policy(&mut self, snapshot: Snapshot) {
		match snapshot.documents.first() {
			Some(doc) => {
				if self.policy.observe_document(doc).is_some() {
					self.recompute();
				}
			}
			None => tracing::debug!("trial policy document absent; keeping cached policy"),
		}
	}

	fn on_timer(&mut self, fired: Fired<TimerKind>) {
		match fired.payload {
			TimerKind::Banner => {
				let Some(banner) = self.banner.take_if(|b| b.token.issued(fired.generation)) else {
					tracing::trace!(generation = fired.generation, "stale rejection timer ignored");
					return;
				};
				tracing::debug!(account = %self.account.id, record = %banner.mark.record_id, "rejection banner expired");
				self.dismissed = Some(banner.mark);
			}
			TimerKind::Deadline => {
				if self.deadline.take_if(|d| d.token.issued(fired.generation)).is_none() {
					tracing::trace!(generation = fired.generation, "stale deadline timer ignored");
					return;
				}
			}
		}
		self.recompute();
	}

	/// Replaces the published state with one derived from the current inputs.
	fn recompute(&mut self) {
		if !self.resolved {
			return;
		}
		let now = self.clock.now();
		let state = match evaluate(&self.records, now) {
			Evaluation::Approved { plan_id, expires_at, .. } => {
				self.clear_banner();
				EntitlementState::Approved { plan_id, expires_at }
			}
			Evaluation::Pending { plan_id, .. } => {
				self.clear_banner();
				EntitlementState::Pending { plan_id }
			}
			Evaluation::Rejected { record_id, plan_id, key } => self.rejection_state(RejectionMark { record_id, key }, plan_id, now),
			Evaluation::Fallback => {
				self.clear_banner();
				self.trial(now)
			}
		};
		self.arm_deadline(state.deadline());
		self.publish(state);
	}

	fn rejection_state(&mut self, mark: RejectionMark, plan_id: String, now: DateTime<Utc>) -> EntitlementState {
		if self.dismissed.as_ref() == Some(&mark) {
			self.clear_banner();
			return self.trial(now);
		}
		if let Some(banner) = &self.banner
			&& banner.mark == mark
		{
			return EntitlementState::RejectedRecent {
				plan_id,
				visible_until: banner.visible_until,
			};
		}

		self.clear_banner();
		let restored = self.restored.take().filter(|(shown, _)| *shown == mark).map(|(_, until)| until);
		if let Some(until) = restored
			&& until <= now
		{
			tracing::debug!(account = %self.account.id, record = %mark.record_id, "rejection banner ended while unwatched");
			self.dismissed = Some(mark);
			return self.trial(now);
		}
		let visibility = self.settings.rejection_visibility;
		let (visible_until, delay) = match restored {
			Some(until) => (until, self.clock.until(until)),
			None => (
				TimeDelta::from_std(visibility)
					.ok()
					.and_then(|delta| now.checked_add_signed(delta))
					.unwrap_or(DateTime::<Utc>::MAX_UTC),
				visibility,
			),
		};
		let token = self.token.scoped(&self.timer_generations);
		schedule_after(TaskClass::Background, delay, token.clone(), self.timer_tx.clone(), TimerKind::Banner);
		tracing::debug!(
			account = %self.account.id,
			record = %mark.record_id,
			%visible_until,
			"rejection banner shown"
		);
		self.banner = Some(Banner { mark, visible_until, token });
		EntitlementState::RejectedRecent { plan_id, visible_until }
	}

	fn trial(&self, now: DateTime<Utc>) -> EntitlementState {
		trial_state(self.account.created_at, &self.policy.current(), now)
	}

	fn clear_banner(&mut self) {
		if let Some(banner) = self.banner.take() {
			banner.token.cancel();
		}
	}

	/// Keeps at most one deadline timer armed, matching the current state's end.
	fn arm_deadline(&mut self, at: Option<DateTime<Utc>>) {
		if let (Some(at), Some(armed)) = (at, &self.deadline)
			&& armed.at == at
		{
			return;
		}
		if let Some(old) = self.deadline.take() {
			old.token.cancel();
		}
		let Some(at) = at else {
			return;
		};
		let token = self.token.scoped(&self.timer_generations);
		schedule_after(TaskClass::Background, self.clock.until(at), token.clone(), self.timer_tx.clone(), TimerKind::Deadline);
		self.deadline = Some(Deadline { at, token });
	}

	fn publish(&mut self, state: EntitlementState) {
		self.cache.put(&self.account.id, state.clone());
		let marks = RejectionMarks {
			shown: self.banner.as_ref().map(|banner| (banner.mark.clone(), banner.visible_until)),
			dismissed: self.dismissed.clone(),
		};
		self.cache.put_marks(&self.account.id, marks);
		let changed = self.state_tx.send_if_modified(|current| {
			if current.as_ref() == Some(&state) {
				return false;
			}
			*current = Some(state.clone());
			true
		});
		if changed {
			tracing::debug!(account = %self.account.id, kind = ?state.kind(), "entitlement.changed");
			if let Some(listener) = self.on_change.as_mut() {
				listener(&state);
			}
		}
	}
}
