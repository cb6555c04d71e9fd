//! Change-stream snapshots.

use tokio::sync::mpsc;

use crate::{Document, Result};

/// Full set of documents matching a subscription at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
	/// Matching documents, in store order.
	pub documents: Vec<Document>,
}

/// Receiving end of a subscription.
///
/// Dropping the stream, or calling [`SnapshotStream::unsubscribe`], ends the
/// subscription. An `Err` item is terminal for the underlying listener: the
/// stream ends after it and callers re-subscribe if they want more.
#[derive(Debug)]
pub struct SnapshotStream {
	rx: mpsc::UnboundedReceiver<Result<Snapshot>>,
}

impl SnapshotStream {
	/// Wraps the receiving side of a subscription channel.
	pub fn new(rx: mpsc::UnboundedReceiver<Result<Snapshot>>) -> Self {
		Self { rx }
	}

	/// Waits for the next snapshot. `None` once the subscription has ended.
	pub async fn next(&mut self) -> Option<Result<Snapshot>> {
		self.rx.recv().await
	}

	/// Ends the subscription.
	pub fn unsubscribe(mut self) {
		self.rx.close();
	}
}
