//! Shared task primitives for the consistency layer.
//!
//! * [`spawn`]: classified task spawning with trace logging
//! * [`GenerationClock`] / [`GenerationToken`]: generation-scoped cancellation
//! * [`schedule_after`]: cancellable delayed delivery guarded by a generation
//! * [`FanOut`]: best-effort fan-out whose panics are reported as [`Joined::Panicked`]

mod class;
mod fan_out;
mod schedule;
mod spawn;
mod token;


pub use class::TaskClass;
pub use fan_out::{FanOut, Joined};
pub use schedule::{Fired, schedule_after};
pub use spawn::spawn;
pub use token::{GenerationClock, GenerationToken};

/// Extracts the panic message from a failed join, if the task panicked.
///
/// Returns `None` for cancelled tasks.
pub fn join_error_panic_message(err: tokio::task::JoinError) -> Option<String> {
	let payload = err.try_into_panic().ok()?;
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		return Some((*msg).to_string());
	}
	if let Some(msg) = payload.downcast_ref::<String>() {
		return Some(msg.clone());
	}
	Some("non-string panic payload".to_string())
}
