use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

fn fields(value: serde_json::Value) -> Fields {
	value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn merge_keeps_untouched_fields() {
	let store = MemoryStore::new();
	store
		.set_document("users", "u1", fields(json!({ "name": "Ada", "role": "student" })), SetOptions::REPLACE)
		.await
		.unwrap();
	store
		.set_document("users", "u1", fields(json!({ "ownerId": "t1" })), SetOptions::MERGE)
		.await
		.unwrap();

	let doc = store.get_document("users", "u1").await.unwrap().unwrap();
	assert_eq!(doc.str("name"), Some("Ada"));
	assert_eq!(doc.str("ownerId"), Some("t1"));

	store
		.set_document("users", "u1", fields(json!({ "name": "Grace" })), SetOptions::REPLACE)
		.await
		.unwrap();
	let doc = store.get_document("users", "u1").await.unwrap().unwrap();
	assert_eq!(doc.get("ownerId"), None);
}

#[tokio::test]
async fn query_applies_every_filter_and_ignores_null() {
	let store = MemoryStore::new();
	store.insert("links", "a", fields(json!({ "studentId": "s1", "active": true })));
	store.insert("links", "b", fields(json!({ "studentId": "s1", "active": false })));
	store.insert("links", "c", fields(json!({ "studentId": null, "active": true })));

	let hits = store
		.query("links", &[Filter::eq("studentId", "s1"), Filter::eq("active", true)])
		.await
		.unwrap();
	assert_eq!(hits.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["a"]);

	let by_id = store.query("links", &[Filter::id("c")]).await.unwrap();
	assert_eq!(by_id.len(), 1);
	assert_eq!(by_id[0].get("studentId"), None);
}

#[tokio::test]
async fn subscription_delivers_full_sets() {
	let store = MemoryStore::new();
	store.insert("payments", "p0", fields(json!({ "ownerId": "other" })));
	let mut stream = store.subscribe("payments", vec![Filter::eq("ownerId", "u1")]).await.unwrap();

	let first = stream.next().await.unwrap().unwrap();
	assert!(first.documents.is_empty());

	let id = store.add_document("payments", fields(json!({ "ownerId": "u1" }))).await.unwrap();
	let second = stream.next().await.unwrap().unwrap();
	assert_eq!(second.documents.len(), 1);
	assert_eq!(second.documents[0].id, id);

	store.insert("payments", "p2", fields(json!({ "ownerId": "u1" })));
	let third = stream.next().await.unwrap().unwrap();
	assert_eq!(third.documents.len(), 2);
}

#[tokio::test]
async fn dropped_streams_are_pruned() {
	let store = MemoryStore::new();
	let stream = store.subscribe("payments", Vec::new()).await.unwrap();
	assert_eq!(store.subscriber_count("payments"), 1);
	stream.unsubscribe();
	assert_eq!(store.subscriber_count("payments"), 0);

	store.insert("payments", "p1", Fields::new());
	assert_eq!(store.subscriber_count("payments"), 0);
}

#[tokio::test]
async fn outages_fail_operations_and_terminate_streams() {
	let store = MemoryStore::new();
	let mut stream = store.subscribe("payments", Vec::new()).await.unwrap();
	let _ = stream.next().await;

	store.set_available(false);
	assert!(matches!(stream.next().await, Some(Err(StoreError::Unavailable(_)))));
	assert!(stream.next().await.is_none());
	assert!(store.get_document("payments", "x").await.is_err());
	assert!(store.subscribe("payments", Vec::new()).await.is_err());

	store.set_available(true);
	assert!(store.get_document("payments", "x").await.unwrap().is_none());
}

#[tokio::test]
async fn fail_next_counts_down() {
	let store = MemoryStore::new();
	store.fail_next(2);
	assert!(store.query("codes", &[]).await.is_err());
	assert!(store.query("codes", &[]).await.is_err());
	assert!(store.query("codes", &[]).await.is_ok());
}

#[tokio::test]
async fn break_subscriptions_only_hits_one_collection() {
	let store = MemoryStore::new();
	let mut payments = store.subscribe("payments", Vec::new()).await.unwrap();
	let mut settings = store.subscribe("settings", Vec::new()).await.unwrap();
	let _ = payments.next().await;
	let _ = settings.next().await;

	store.break_subscriptions("payments");
	assert!(matches!(payments.next().await, Some(Err(_))));
	assert_eq!(store.subscriber_count("settings"), 1);
}

#[tokio::test]
async fn writes_are_counted() {
	let store = MemoryStore::new();
	store.set_document("c", "a", Fields::new(), SetOptions::REPLACE).await.unwrap();
	store.delete_document("c", "a").await.unwrap();
	store.delete_document("c", "missing").await.unwrap();
	assert_eq!(store.writes(), 3);
	assert!(store.peek("c", "a").is_none());
}
