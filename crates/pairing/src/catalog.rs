//! Course/enrollment collaborator, used only for post-pairing side effects.

use std::sync::Arc;

use async_trait::async_trait;
use lyceum_primitives::AccountId;
use lyceum_worker::{FanOut, Joined, TaskClass};
use serde::Serialize;

use crate::CatalogError;

/// Something an owner offers to its dependents.
#[derive(Debug, Clone, PartialEq)]
pub struct Offering {
	pub id: String,
	pub title: String,
	/// Zero means free.
	pub price: f64,
}

impl Offering {
	pub fn is_free(&self) -> bool {
		self.price <= 0.0
	}
}

/// "Now available" payload sent for paid offerings instead of enrolling.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
	pub owner_id: AccountId,
	pub offering_id: String,
	pub title: String,
	pub price: f64,
}

impl Notice {
	pub fn available(owner: &AccountId, offering: &Offering) -> Self {
		Self {
			owner_id: owner.clone(),
			offering_id: offering.id.clone(),
			title: offering.title.clone(),
			price: offering.price,
		}
	}
}

#[async_trait]
pub trait CourseCatalog: Send + Sync + 'static {
	async fn list_offerings(&self, owner: &AccountId) -> Result<Vec<Offering>, CatalogError>;
	async fn enroll(&self, dependent: &AccountId, offering_id: &str) -> Result<(), CatalogError>;
	async fn notify(&self, dependent: &AccountId, notice: Notice) -> Result<(), CatalogError>;
}

/// Tally of one post-pairing fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrantReport {
	pub enrolled: usize,
	pub notified: usize,
	pub failed: usize,
}

enum Grant {
	Enrolled,
	Notified,
}

/// Enrolls `dependent` in every free offering of `owner` and sends a notice
/// for every paid one.
///
/// Each item runs on its own task; a failing item is logged and counted but
/// never stops the others.
pub async fn grant_offerings(catalog: Arc<dyn CourseCatalog>, dependent: AccountId, owner: AccountId) -> GrantReport {
	let offerings = match catalog.list_offerings(&owner).await {
		Ok(offerings) => offerings,
		Err(error) => {
			tracing::warn!(%owner, %dependent, %error, "cannot list offerings after pairing");
			return GrantReport {
				failed: 1,
				..GrantReport::default()
			};
		}
	};

	let mut tasks = FanOut::new(TaskClass::Background, "offering_grants");
	for offering in offerings {
		let catalog = Arc::clone(&catalog);
		let dependent = dependent.clone();
		let owner = owner.clone();
		tasks.push(async move {
			let result = if offering.is_free() {
				catalog.enroll(&dependent, &offering.id).await.map(|()| Grant::Enrolled)
			} else {
				catalog.notify(&dependent, Notice::available(&owner, &offering)).await.map(|()| Grant::Notified)
			};
			result.map_err(|error| (offering.id, error))
		});
	}

	let mut report = GrantReport::default();
	while let Some(joined) = tasks.next().await {
		match joined {
			Joined::Done(Ok(Grant::Enrolled)) => report.enrolled += 1,
			Joined::Done(Ok(Grant::Notified)) => report.notified += 1,
			Joined::Done(Err((offering, error))) => {
				report.failed += 1;
				tracing::warn!(%dependent, offering, %error, "offering grant failed");
			}
			Joined::Panicked(_) | Joined::Cancelled => report.failed += 1,
		}
	}
	tracing::debug!(%dependent, %owner, ?report, "offerings granted");
	report
}
