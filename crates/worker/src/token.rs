//! Generation-tagged cancellation for watches and the timers they arm.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Hands out increasing generation numbers, starting at 1. Clones share one counter.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	last: Arc<AtomicU64>,
}

impl GenerationClock {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn next(&self) -> u64 {
		self.last.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}

	/// Root token for a new watch.
	pub fn token(&self) -> GenerationToken {
		GenerationToken::new(self.next(), CancellationToken::new())
	}
}

/// Cancellation handle stamped with the generation it was issued in.
///
/// A timer fires with its token's generation. The watch that armed it acts on
/// the firing only while it still holds a token that [`issued`](Self::issued)
/// that generation; rearming or disarming makes older firings inert.
#[derive(Debug, Clone)]
pub struct GenerationToken {
	generation: u64,
	cancel: CancellationToken,
}

impl GenerationToken {
	pub fn new(generation: u64, cancel: CancellationToken) -> Self {
		Self { generation, cancel }
	}

	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Whether a delivery tagged `generation` belongs to this token.
	pub const fn issued(&self, generation: u64) -> bool {
		self.generation == generation
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Token in the next generation of `clock`, cancelled whenever `self` is.
	pub fn scoped(&self, clock: &GenerationClock) -> Self {
		Self::new(clock.next(), self.cancel.child_token())
	}
}
