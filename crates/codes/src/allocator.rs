use std::collections::VecDeque;
use std::sync::Arc;

use lyceum_config::{CodesConfig, Config};
use lyceum_primitives::{AccountId, Clock, SystemClock, timestamp};
use lyceum_store::{DocumentStore, Fields, SetOptions};
use parking_lot::Mutex;
use serde_json::Value;

use crate::{CodeError, CodeSource, InvitationCode, RandomCodes, Result};

/// Field naming the owner on a code lookup document.
pub const OWNER_FIELD: &str = "ownerId";

/// Denormalized copy of the owner's active code on the owner's account document.
pub const CODE_FIELD: &str = "invitationCode";

/// Result of asking for a specific code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
	/// The owner now holds the code (or already did).
	Reserved(InvitationCode),
	/// Another owner holds the code.
	Taken,
}

/// Allocates, reserves and releases invitation codes.
///
/// Every write is preceded by a read of the lookup document. Nothing prevents
/// another client from writing in between; the window is accepted and callers
/// must tolerate a redraw.
pub struct CodeAllocator<S> {
	store: Arc<S>,
	codes: String,
	accounts: String,
	limits: CodesConfig,
	clock: Arc<dyn Clock>,
	source: Mutex<Box<dyn CodeSource>>,
	/// Codes recently handed out by `allocate`, oldest first, so sequential
	/// calls do not repeat a code before it is written. Holds at most
	/// `recent_issued` entries; reserving or releasing a code drops it early.
	issued: Mutex<VecDeque<InvitationCode>>,
}

impl<S: DocumentStore> CodeAllocator<S> {
	pub fn new(store: Arc<S>, config: &Config) -> Self {
		Self {
			store,
			codes: config.collections.codes.clone(),
			accounts: config.collections.accounts.clone(),
			limits: config.codes.clone(),
			clock: Arc::new(SystemClock),
			source: Mutex::new(Box::new(RandomCodes::new())),
			issued: Mutex::new(VecDeque::new()),
		}
	}

	#[must_use]
	pub fn with_source(self, source: impl CodeSource) -> Self {
		Self {
			source: Mutex::new(Box::new(source)),
			..self
		}
	}

	#[must_use]
	pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
		Self { clock, ..self }
	}

	/// Draws a code absent from the lookup collection.
	///
	/// Collisions redraw. Gives up with [`CodeError::ExhaustedRetries`] after
	/// `max_draws` draws in total or `max_store_failures` consecutive failed
	/// existence checks.
	pub async fn allocate(&self) -> Result<InvitationCode> {
		let mut attempts = 0;
		let mut failures = 0;
		while attempts < self.limits.max_draws {
			attempts += 1;
			let code = self.source.lock().draw();
			if self.issued.lock().contains(&code) {
				tracing::trace!(%code, "code already issued locally; redrawing");
				continue;
			}
			match self.store.get_document(&self.codes, code.as_str()).await {
				Ok(None) => {
					self.remember_issued(&code);
					tracing::debug!(%code, attempts, "invitation code allocated");
					return Ok(code);
				}
				Ok(Some(_)) => {
					failures = 0;
					tracing::debug!(%code, "invitation code collision; redrawing");
				}
				Err(error) => {
					failures += 1;
					tracing::warn!(%code, %error, failures, "invitation code existence check failed");
					if failures >= self.limits.max_store_failures {
						break;
					}
				}
			}
		}
		Err(CodeError::ExhaustedRetries { attempts })
	}

	/// Gives `owner` the code `desired`, replacing any code it held before.
	///
	/// The previous lookup document is deleted before the new one is written.
	/// A failure between the two leaves the old code reachable until the next
	/// reservation; it never hands one code to two owners.
	pub async fn reserve(&self, owner: &AccountId, desired: &str) -> Result<ReserveOutcome> {
		let code = InvitationCode::parse(desired)?;
		self.reserve_code(owner, &code).await
	}

	async fn reserve_code(&self, owner: &AccountId, code: &InvitationCode) -> Result<ReserveOutcome> {
		let current = self.code_of(owner).await?;
		match self.lookup(code).await? {
			Some(holder) if holder != *owner => {
				tracing::debug!(%code, %owner, "invitation code taken by another owner");
				return Ok(ReserveOutcome::Taken);
			}
			Some(_) => {
				if current.as_ref() != Some(code) {
					self.set_owner_code(owner, Value::String(code.to_string())).await?;
				}
				return Ok(ReserveOutcome::Reserved(code.clone()));
			}
			None => {}
		}

		if let Some(previous) = current.filter(|previous| previous != code) {
			self.delete_lookup_if_held(&previous, owner).await?;
		}

		let mut fields = Fields::new();
		fields.insert(OWNER_FIELD.into(), Value::String(owner.to_string()));
		fields.insert("createdAt".into(), timestamp::encode(self.clock.now()));
		self.store
			.set_document(&self.codes, code.as_str(), fields, SetOptions::REPLACE)
			.await?;
		self.set_owner_code(owner, Value::String(code.to_string())).await?;
		self.forget_issued(code);

		tracing::info!(%code, %owner, "invitation code reserved");
		Ok(ReserveOutcome::Reserved(code.clone()))
	}

	/// Removes a code's lookup document and, if the owner still points at it,
	/// the owner's denormalized field. Releasing an unknown code is a no-op.
	pub async fn release(&self, code: &InvitationCode) -> Result<()> {
		let holder = self.lookup(code).await?;
		self.store.delete_document(&self.codes, code.as_str()).await?;
		self.forget_issued(code);
		if let Some(owner) = holder
			&& self.code_of(&owner).await?.as_ref() == Some(code)
		{
			self.set_owner_code(&owner, Value::Null).await?;
		}
		tracing::debug!(%code, "invitation code released");
		Ok(())
	}

	/// Owner currently holding `code`, if any.
	pub async fn lookup(&self, code: &InvitationCode) -> Result<Option<AccountId>> {
		let doc = self.store.get_document(&self.codes, code.as_str()).await?;
		Ok(doc.and_then(|doc| doc.str(OWNER_FIELD).map(AccountId::from)))
	}

	/// Code recorded on the owner's account document.
	pub async fn code_of(&self, owner: &AccountId) -> Result<Option<InvitationCode>> {
		let Some(doc) = self.store.get_document(&self.accounts, owner.as_str()).await? else {
			return Ok(None);
		};
		let Some(raw) = doc.str(CODE_FIELD) else {
			return Ok(None);
		};
		match InvitationCode::parse(raw) {
			Ok(code) => Ok(Some(code)),
			Err(error) => {
				tracing::debug!(%owner, %error, "ignoring malformed denormalized invitation code");
				Ok(None)
			}
		}
	}

	/// Returns the owner's active code, allocating and reserving one if needed.
	pub async fn ensure_code(&self, owner: &AccountId) -> Result<InvitationCode> {
		if let Some(code) = self.code_of(owner).await?
			&& self.lookup(&code).await?.as_ref() == Some(owner)
		{
			return Ok(code);
		}
		for _ in 0..self.limits.max_draws {
			let code = self.allocate().await?;
			match self.reserve_code(owner, &code).await? {
				ReserveOutcome::Reserved(code) => return Ok(code),
				ReserveOutcome::Taken => {
					self.forget_issued(&code);
					tracing::debug!(%code, "allocated code taken before reservation; retrying");
				}
			}
		}
		Err(CodeError::ExhaustedRetries {
			attempts: self.limits.max_draws,
		})
	}

	/// Number of allocated codes still remembered as issued.
	pub fn issued_len(&self) -> usize {
		self.issued.lock().len()
	}

	fn remember_issued(&self, code: &InvitationCode) {
		let cap = self.limits.recent_issued as usize;
		if cap == 0 {
			return;
		}
		let mut issued = self.issued.lock();
		while issued.len() >= cap {
			issued.pop_front();
		}
		issued.push_back(code.clone());
	}

	fn forget_issued(&self, code: &InvitationCode) {
		self.issued.lock().retain(|issued| issued != code);
	}

	async fn delete_lookup_if_held(&self, code: &InvitationCode, owner: &AccountId) -> Result<()> {
		if self.lookup(code).await?.as_ref() == Some(owner) {
			self.store.delete_document(&self.codes, code.as_str()).await?;
		}
		Ok(())
	}

	async fn set_owner_code(&self, owner: &AccountId, value: Value) -> Result<()> {
		let mut fields = Fields::new();
		fields.insert(CODE_FIELD.into(), value);
		self.store
			.set_document(&self.accounts, owner.as_str(), fields, SetOptions::MERGE)
			.await?;
		Ok(())
	}
}
