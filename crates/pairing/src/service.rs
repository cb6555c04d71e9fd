use std::sync::Arc;

use lyceum_config::Config;
use lyceum_primitives::{AccountId, Clock, SystemClock, timestamp};
use lyceum_store::{Document, DocumentStore, Fields, Filter, SetOptions};
use lyceum_worker::TaskClass;
use serde_json::Value;

use crate::{CourseCatalog, Identity, PairError, Result, grant_offerings};

/// Owner field on the dependent's account document. Authoritative.
pub const OWNER_FIELD: &str = "ownerId";
/// Dependent field on a legacy link document.
pub const LEGACY_DEPENDENT_FIELD: &str = "studentId";
/// Owner field on a legacy link document.
pub const LEGACY_OWNER_FIELD: &str = "teacherId";

const LEGACY_ACTIVE_FIELD: &str = "active";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
	Linked,
	/// The dependent already belongs to another owner. Nothing was written.
	AlreadyLinkedToOther(AccountId),
	AlreadyLinkedToSame,
}

/// Links dependents to owners, permanently.
pub struct PairingService<S> {
	store: Arc<S>,
	identity: Arc<dyn Identity>,
	catalog: Arc<dyn CourseCatalog>,
	accounts: String,
	links: String,
	clock: Arc<dyn Clock>,
}

impl<S: DocumentStore> PairingService<S> {
	pub fn new(store: Arc<S>, identity: Arc<dyn Identity>, catalog: Arc<dyn CourseCatalog>, config: &Config) -> Self {
		Self {
			store,
			identity,
			catalog,
			accounts: config.collections.accounts.clone(),
			links: config.collections.links.clone(),
			clock: Arc::new(SystemClock),
		}
	}

	#[must_use]
	pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
		Self { clock, ..self }
	}

	/// Links `dependent` to `owner` unless it already has an owner.
	///
	/// Reads the dependent's document (creating it from the signed-in session
	/// when absent), then the legacy links, and only writes when neither names
	/// an owner. The owner field and the legacy link are two separate writes;
	/// the owner field is written first and wins on every later attempt.
	///
	/// On [`PairOutcome::Linked`] the owner's offerings are granted in the
	/// background.
	pub async fn pair(&self, dependent: &AccountId, owner: &AccountId) -> Result<PairOutcome> {
		let doc = match self.store.get_document(&self.accounts, dependent.as_str()).await? {
			Some(doc) => doc,
			None => self.create_profile(dependent).await?,
		};

		if let Some(existing) = doc.str(OWNER_FIELD).map(AccountId::from) {
			if existing == *owner {
				return Ok(PairOutcome::AlreadyLinkedToSame);
			}
			tracing::warn!(%dependent, %owner, %existing, "pairing conflict: dependent already has an owner");
			return Ok(PairOutcome::AlreadyLinkedToOther(existing));
		}

		let legacy = self.legacy_owners(dependent).await?;
		if let Some(existing) = legacy.iter().find(|existing| *existing != owner) {
			tracing::warn!(%dependent, %owner, %existing, "pairing conflict: legacy link names another owner");
			return Ok(PairOutcome::AlreadyLinkedToOther(existing.clone()));
		}

		let now = timestamp::encode(self.clock.now());
		let mut fields = Fields::new();
		fields.insert(OWNER_FIELD.into(), Value::String(owner.to_string()));
		fields.insert("linkedAt".into(), now.clone());
		self.store
			.set_document(&self.accounts, dependent.as_str(), fields, SetOptions::MERGE)
			.await?;

		if legacy.is_empty() {
			let mut link = Fields::new();
			link.insert(LEGACY_DEPENDENT_FIELD.into(), Value::String(dependent.to_string()));
			link.insert(LEGACY_OWNER_FIELD.into(), Value::String(owner.to_string()));
			link.insert(LEGACY_ACTIVE_FIELD.into(), Value::Bool(true));
			link.insert("createdAt".into(), now);
			if let Err(error) = self.store.add_document(&self.links, link).await {
				tracing::warn!(%dependent, %owner, %error, "legacy link write failed; owner field is authoritative");
			}
		}

		tracing::info!(%dependent, %owner, "dependent linked");
		let catalog = Arc::clone(&self.catalog);
		lyceum_worker::spawn(TaskClass::Background, grant_offerings(catalog, dependent.clone(), owner.clone()));
		Ok(PairOutcome::Linked)
	}

	/// Current owner of `dependent`: the account document first, then any
	/// active legacy link.
	pub async fn owner_of(&self, dependent: &AccountId) -> Result<Option<AccountId>> {
		if let Some(doc) = self.store.get_document(&self.accounts, dependent.as_str()).await?
			&& let Some(owner) = doc.str(OWNER_FIELD)
		{
			return Ok(Some(AccountId::from(owner)));
		}
		Ok(self.legacy_owners(dependent).await?.into_iter().next())
	}

	async fn legacy_owners(&self, dependent: &AccountId) -> Result<Vec<AccountId>> {
		let filters = [
			Filter::eq(LEGACY_DEPENDENT_FIELD, dependent.as_str()),
			Filter::eq(LEGACY_ACTIVE_FIELD, true),
		];
		let docs = self.store.query(&self.links, &filters).await?;
		Ok(docs
			.iter()
			.filter_map(|doc| doc.str(LEGACY_OWNER_FIELD))
			.map(AccountId::from)
			.collect())
	}

	/// Idempotently creates the dependent's account document from the session.
	async fn create_profile(&self, dependent: &AccountId) -> Result<Document> {
		let Some(account) = self.identity.current().filter(|account| account.id == *dependent) else {
			return Err(PairError::NoSessionProfile(dependent.clone()));
		};

		let mut fields = Fields::new();
		if let Some(name) = &account.display_name {
			fields.insert("displayName".into(), Value::String(name.clone()));
		}
		if let Some(email) = &account.email {
			fields.insert("email".into(), Value::String(email.clone()));
		}
		fields.insert("createdAt".into(), timestamp::encode(account.created_at));
		// Merge so a concurrent creation (and any owner it wrote) survives.
		self.store
			.set_document(&self.accounts, dependent.as_str(), fields.clone(), SetOptions::MERGE)
			.await?;
		tracing::debug!(%dependent, "account document created from session");

		let doc = self.store.get_document(&self.accounts, dependent.as_str()).await?;
		Ok(doc.unwrap_or_else(|| Document::new(dependent.as_str(), fields)))
	}
}
