use chrono::TimeZone;
use serde_json::json;

use super::*;

fn at(secs: i64) -> DateTime<Utc> {
	Utc.timestamp_opt(secs, 0).single().unwrap()
}

#[test]
fn decodes_all_stored_timestamp_shapes() {
	let expected = at(1_700_000_000);
	assert_eq!(timestamp::decode(&json!("2023-11-14T22:13:20Z")), Some(expected));
	assert_eq!(timestamp::decode(&json!("2023-11-15T00:13:20+02:00")), Some(expected));
	assert_eq!(timestamp::decode(&json!(1_700_000_000_000_i64)), Some(expected));
	assert_eq!(timestamp::decode(&json!({ "seconds": 1_700_000_000, "nanoseconds": 0 })), Some(expected));
}

#[test]
fn rejects_null_and_garbage() {
	assert_eq!(timestamp::decode(&json!(null)), None);
	assert_eq!(timestamp::decode(&json!("yesterday")), None);
	assert_eq!(timestamp::decode(&json!(true)), None);
}

#[test]
fn encodes_rfc3339_with_millis() {
	assert_eq!(timestamp::encode(at(0)), json!("1970-01-01T00:00:00.000Z"));
}

#[test]
fn until_saturates_at_zero() {
	let clock = SystemClock;
	assert_eq!(clock.until(at(0)), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn anchored_clock_follows_tokio_time() {
	let clock = AnchoredClock::new(at(1_000));
	assert_eq!(clock.now(), at(1_000));

	tokio::time::advance(Duration::from_secs(90)).await;
	assert_eq!(clock.now(), at(1_090));
	assert_eq!(clock.until(at(1_100)), Duration::from_secs(10));
}
