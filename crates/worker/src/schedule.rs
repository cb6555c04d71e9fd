use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{GenerationToken, TaskClass, spawn};

/// Delivery from a scheduled task whose delay elapsed before cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<T> {
	pub generation: u64,
	pub payload: T,
}

/// Sends `payload` to `tx` after `delay`, tagged with the token's generation.
///
/// Nothing is sent if the token is cancelled first or the receiver has been
/// dropped. Receivers must still compare `Fired::generation` with their
/// current generation: cancellation racing the timer can let one stale
/// delivery through.
pub fn schedule_after<T>(
	class: TaskClass,
	delay: Duration,
	token: GenerationToken,
	tx: mpsc::UnboundedSender<Fired<T>>,
	payload: T,
) -> JoinHandle<()>
where
	T: Send + 'static,
{
	spawn(class, async move {
		tokio::select! {
			biased;
			() = token.cancelled() => {
				tracing::trace!(generation = token.generation(), "worker.schedule.cancelled");
			}
			() = tokio::time::sleep(delay) => {
				if token.is_cancelled() {
					return;
				}
				let fired = Fired { generation: token.generation(), payload };
				if tx.send(fired).is_err() {
					tracing::trace!(generation = token.generation(), "worker.schedule.receiver_closed");
				}
			}
		}
	})
}
