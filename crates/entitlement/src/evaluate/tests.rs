use chrono::TimeZone;
use lyceum_config::TrialUnit;
use lyceum_primitives::AccountId;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

fn at(secs: i64) -> DateTime<Utc> {
	Utc.timestamp_opt(secs, 0).single().unwrap()
}

fn record(id: &str, plan: &str, created: i64, status: PaymentStatus) -> PaymentRecord {
	PaymentRecord {
		id: id.to_string(),
		owner_id: AccountId::from("u1"),
		plan_id: plan.to_string(),
		amount: 10.0,
		currency: "USD".into(),
		created_at: at(created),
		status,
	}
}

fn pending(id: &str, created: i64) -> PaymentRecord {
	record(id, "monthly", created, PaymentStatus::Pending)
}

fn approved(id: &str, created: i64, approved_at: Option<i64>, expires_at: Option<i64>) -> PaymentRecord {
	record(
		id,
		"monthly",
		created,
		PaymentStatus::Approved {
			approved_at: approved_at.map(at),
			expires_at: expires_at.map(at),
		},
	)
}

fn rejected(id: &str, created: i64, cancelled_at: Option<i64>) -> PaymentRecord {
	record(
		id,
		"yearly",
		created,
		PaymentStatus::Rejected {
			cancelled_at: cancelled_at.map(at),
		},
	)
}

#[test]
fn empty_snapshot_falls_back() {
	assert_eq!(evaluate(&[], at(0)), Evaluation::Fallback);
}

#[test]
fn valid_approval_beats_pending_and_newer_rejection() {
	let records = [approved("a", 10, Some(20), Some(1_000)), pending("p", 30), rejected("r", 40, Some(50))];
	assert_eq!(
		evaluate(&records, at(100)),
		Evaluation::Approved {
			record_id: "a".into(),
			plan_id: "monthly".into(),
			expires_at: Some(at(1_000)),
		}
	);
}

#[test]
fn approval_without_expiry_never_lapses() {
	let records = [approved("a", 10, None, None)];
	assert!(matches!(evaluate(&records, at(i64::from(u32::MAX))), Evaluation::Approved { .. }));
}

#[test]
fn expiry_instant_is_exclusive() {
	let records = [approved("a", 10, Some(20), Some(100))];
	assert!(matches!(evaluate(&records, at(99)), Evaluation::Approved { .. }));
	assert_eq!(evaluate(&records, at(100)), Evaluation::Fallback);
}

#[test]
fn only_the_latest_approval_is_considered() {
	// The older approval would still be valid, but the newer one decides and has lapsed.
	let records = [approved("old", 0, Some(10), Some(5_000)), approved("new", 20, Some(30), Some(60))];
	assert_eq!(evaluate(&records, at(100)), Evaluation::Fallback);
}

#[test]
fn approval_key_falls_back_to_created_at() {
	// "b" lacks approvedAt; its createdAt (40) is later than a's approvedAt (30).
	let records = [approved("a", 0, Some(30), Some(50)), approved("b", 40, None, None)];
	assert!(matches!(evaluate(&records, at(100)), Evaluation::Approved { record_id, .. } if record_id == "b"));
}

#[test]
fn expired_approval_yields_to_pending() {
	let records = [approved("a", 0, Some(10), Some(20)), pending("p", 5)];
	assert_eq!(
		evaluate(&records, at(100)),
		Evaluation::Pending {
			record_id: "p".into(),
			plan_id: "monthly".into(),
		}
	);
}

#[test]
fn pending_beats_a_newer_rejection() {
	let records = [pending("p", 10), rejected("r", 20, Some(30))];
	assert!(matches!(evaluate(&records, at(100)), Evaluation::Pending { .. }));
}

#[test]
fn latest_rejection_is_selected_by_cancelled_at() {
	let records = [rejected("r1", 10, Some(90)), rejected("r2", 50, Some(60)), rejected("r3", 80, None)];
	assert_eq!(
		evaluate(&records, at(100)),
		Evaluation::Rejected {
			record_id: "r1".into(),
			plan_id: "yearly".into(),
			key: at(90),
		}
	);
}

#[test]
fn rejection_older_than_lapsed_approval_is_hidden() {
	let records = [approved("a", 0, Some(50), Some(60)), rejected("r", 10, Some(40))];
	assert_eq!(evaluate(&records, at(100)), Evaluation::Fallback);
}

#[test]
fn rejection_newer_than_lapsed_approval_is_shown() {
	let records = [approved("a", 0, Some(50), Some(60)), rejected("r", 10, Some(70))];
	assert!(matches!(evaluate(&records, at(100)), Evaluation::Rejected { key, .. } if key == at(70)));
}

#[test]
fn rejection_must_be_strictly_newest() {
	let records = [approved("a", 0, Some(50), Some(60)), rejected("r", 10, Some(50))];
	assert_eq!(evaluate(&records, at(100)), Evaluation::Fallback);
}

#[test]
fn rejection_without_cancelled_at_orders_by_created_at() {
	// Kept as observed: a rejection missing `cancelledAt` competes with its
	// submission time, even if the review happened after the approval.
	let records = [approved("a", 0, None, Some(60)), rejected("r", 40, None)];
	assert!(matches!(evaluate(&records, at(100)), Evaluation::Rejected { .. }));

	let records = [approved("a", 50, None, Some(60)), rejected("r", 40, None)];
	assert_eq!(evaluate(&records, at(100)), Evaluation::Fallback);
}

#[test]
fn trial_window_in_days() {
	let created = at(1_000_000);
	let policy = TrialPolicy::new(TrialUnit::Days, 1);
	for offset in [0, 1, 43_200, 86_399] {
		assert_eq!(
			trial_state(created, &policy, at(1_000_000 + offset)),
			EntitlementState::TrialActive {
				trial_ends_at: at(1_086_400)
			}
		);
	}
	for offset in [86_400, 86_401, 10 * 86_400] {
		assert_eq!(
			trial_state(created, &policy, at(1_000_000 + offset)),
			EntitlementState::TrialExpired {
				trial_ended_at: at(1_086_400)
			}
		);
	}
}

#[test]
fn trial_window_in_minutes() {
	let policy = TrialPolicy::new(TrialUnit::Minutes, 10);
	assert!(matches!(trial_state(at(0), &policy, at(599)), EntitlementState::TrialActive { .. }));
	assert!(matches!(trial_state(at(0), &policy, at(600)), EntitlementState::TrialExpired { .. }));
}

#[test]
fn trial_past_the_calendar_never_ends() {
	let created = at(1_000_000);
	let policy = TrialPolicy::new(TrialUnit::Days, 200_000_000);
	assert_eq!(
		trial_state(created, &policy, created),
		EntitlementState::TrialActive {
			trial_ends_at: DateTime::<Utc>::MAX_UTC
		}
	);
}

fn arb_records() -> impl Strategy<Value = Vec<PaymentRecord>> {
	let one = (0u8..3, 0i64..1_000, proptest::option::of(0i64..1_000), proptest::option::of(0i64..2_000));
	proptest::collection::vec(one, 0..8).prop_map(|raw| {
		raw.into_iter()
			.enumerate()
			.map(|(i, (status, created, stamp, expiry))| {
				let id = format!("r{i}");
				match status {
					0 => pending(&id, created),
					1 => approved(&id, created, stamp, expiry),
					_ => rejected(&id, created, stamp),
				}
			})
			.collect()
	})
}

fn latest_approval_is_valid(records: &[PaymentRecord], now: DateTime<Utc>) -> bool {
	records
		.iter()
		.filter(|r| matches!(r.status, PaymentStatus::Approved { .. }))
		.max_by_key(|r| (r.ordering_key(), r.id.clone()))
		.is_some_and(|r| match r.status {
			PaymentStatus::Approved { expires_at, .. } => expires_at.is_none_or(|e| now < e),
			_ => false,
		})
}

proptest! {
	#[test]
	fn valid_approval_always_wins(records in arb_records(), now in 0i64..2_000) {
		let now = at(now);
		if latest_approval_is_valid(&records, now) {
			prop_assert!(matches!(evaluate(&records, now), Evaluation::Approved { .. }), "expected approval");
		}
	}

	#[test]
	fn pending_wins_without_valid_approval(records in arb_records(), now in 0i64..2_000) {
		let now = at(now);
		if !latest_approval_is_valid(&records, now) && records.iter().any(PaymentRecord::is_pending) {
			prop_assert!(matches!(evaluate(&records, now), Evaluation::Pending { .. }), "expected pending");
		}
	}

	#[test]
	fn rejection_surfaces_iff_strictly_newest(records in arb_records(), now in 0i64..2_000) {
		let now = at(now);
		let no_pending = !records.iter().any(PaymentRecord::is_pending);
		if no_pending && !latest_approval_is_valid(&records, now) {
			let newest_rejection = records
				.iter()
				.filter(|r| matches!(r.status, PaymentStatus::Rejected { .. }))
				.map(PaymentRecord::ordering_key)
				.max();
			let newest_other = records
				.iter()
				.filter(|r| !matches!(r.status, PaymentStatus::Rejected { .. }))
				.map(PaymentRecord::ordering_key)
				.max();
			let expect_rejected = match (newest_rejection, newest_other) {
				(Some(r), Some(o)) => r > o,
				(Some(_), None) => true,
				(None, _) => false,
			};
			let is_rejected = matches!(evaluate(&records, now), Evaluation::Rejected { .. });
			prop_assert_eq!(is_rejected, expect_rejected);
		}
	}
}
