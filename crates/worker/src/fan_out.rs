use std::future::Future;

use tokio::task::JoinSet;

use crate::{TaskClass, join_error_panic_message};

/// How one fanned-out task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Joined<T> {
	Done(T),
	/// The task panicked; carries the panic message.
	Panicked(String),
	/// The task was aborted before finishing.
	Cancelled,
}

/// Set of independent best-effort tasks whose results are collected in
/// completion order. A panicking task is reported, never propagated.
#[derive(Debug)]
pub struct FanOut<T> {
	class: TaskClass,
	label: &'static str,
	tasks: JoinSet<T>,
}

impl<T> FanOut<T>
where
	T: Send + 'static,
{
	pub fn new(class: TaskClass, label: &'static str) -> Self {
		Self {
			class,
			label,
			tasks: JoinSet::new(),
		}
	}

	/// Tasks still running or not yet collected.
	pub fn pending(&self) -> usize {
		self.tasks.len()
	}

	pub fn push<F>(&mut self, fut: F)
	where
		F: Future<Output = T> + Send + 'static,
	{
		tracing::trace!(worker_class = self.class.as_str(), label = self.label, pending = self.tasks.len(), "worker.fan_out.push");
		let handle = crate::spawn::runtime_handle();
		let _guard = handle.enter();
		self.tasks.spawn(fut);
	}

	/// Next finished task, or `None` once every task has been collected.
	pub async fn next(&mut self) -> Option<Joined<T>> {
		let joined = match self.tasks.join_next().await? {
			Ok(value) => Joined::Done(value),
			Err(err) => match join_error_panic_message(err) {
				Some(msg) => {
					tracing::error!(label = self.label, panic = %msg, "worker.fan_out.panicked");
					Joined::Panicked(msg)
				}
				None => Joined::Cancelled,
			},
		};
		Some(joined)
	}
}
