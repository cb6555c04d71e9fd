use std::io::Write;
use std::path::Path;

use anyhow::{Context, bail};
use chrono::{DateTime, TimeDelta, Utc};
use lyceum_codes::{CodeSource, InvitationCode, RandomCodes};
use lyceum_config::Config;
use lyceum_entitlement::{EntitlementState, Evaluation, PaymentRecord, evaluate, trial_state};
use lyceum_primitives::AccountId;
use lyceum_store::Document;
use serde_json::Value;

use crate::cli::{CodeAction, Command};

pub fn run(command: Command, config: &Config, out: &mut impl Write) -> anyhow::Result<()> {
	match command {
		Command::Evaluate {
			records,
			created_at,
			now,
			account,
		} => {
			let text = std::fs::read_to_string(&records).with_context(|| format!("reading {}", records.display()))?;
			let documents = parse_documents(&text).with_context(|| format!("parsing {}", records.display()))?;
			let account = account.map(AccountId::from);
			let state = evaluate_documents(&documents, account.as_ref(), created_at, now.unwrap_or_else(Utc::now), config);
			writeln!(out, "{}", serde_json::to_string_pretty(&state)?)?;
		}
		Command::Code { action } => match action {
			CodeAction::Draw { count, seed } => {
				let mut source = seed.map_or_else(RandomCodes::new, RandomCodes::seeded);
				for _ in 0..count {
					writeln!(out, "{}", source.draw())?;
				}
			}
			CodeAction::Check { code } => {
				let code = InvitationCode::parse(&code)?;
				writeln!(out, "{code}")?;
			}
		},
	}
	Ok(())
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
	match path {
		Some(path) => Ok(Config::load(path)?),
		None => Ok(Config::default()),
	}
}

/// Reads a JSON array of documents; each element carries its id in `"id"`.
pub fn parse_documents(text: &str) -> anyhow::Result<Vec<Document>> {
	let Value::Array(items) = serde_json::from_str::<Value>(text)? else {
		bail!("expected a JSON array of documents");
	};
	items
		.into_iter()
		.enumerate()
		.map(|(index, item)| {
			let Value::Object(mut fields) = item else {
				bail!("document {index} is not an object");
			};
			let id = match fields.remove("id") {
				Some(Value::String(id)) => id,
				_ => format!("doc-{index}"),
			};
			Ok(Document::new(id, fields))
		})
		.collect()
}

/// One-shot resolution: a rejection counts as observed at `now`.
pub fn evaluate_documents(
	documents: &[Document],
	account: Option<&AccountId>,
	created_at: DateTime<Utc>,
	now: DateTime<Utc>,
	config: &Config,
) -> EntitlementState {
	let records: Vec<PaymentRecord> = documents
		.iter()
		.filter_map(|doc| match PaymentRecord::from_document(doc, now) {
			Ok(record) => Some(record),
			Err(error) => {
				tracing::warn!(record = %doc.id, %error, "skipping malformed payment record");
				None
			}
		})
		.filter(|record| account.is_none_or(|account| record.owner_id == *account))
		.collect();
	tracing::debug!(records = records.len(), %now, "evaluating");

	match evaluate(&records, now) {
		Evaluation::Approved { plan_id, expires_at, .. } => EntitlementState::Approved { plan_id, expires_at },
		Evaluation::Pending { plan_id, .. } => EntitlementState::Pending { plan_id },
		Evaluation::Rejected { plan_id, .. } => {
			let visibility = TimeDelta::from_std(config.entitlement.rejection_visibility()).unwrap_or(TimeDelta::MAX);
			EntitlementState::RejectedRecent {
				plan_id,
				visible_until: now.checked_add_signed(visibility).unwrap_or(DateTime::<Utc>::MAX_UTC),
			}
		}
		Evaluation::Fallback => trial_state(created_at, &config.entitlement.default_trial, now),
	}
}
