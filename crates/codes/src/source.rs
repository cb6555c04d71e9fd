//! Where candidate codes come from.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::code::{ALPHABET, CODE_LEN, InvitationCode};

/// Produces candidate codes. Uniqueness is checked by the allocator, not here.
pub trait CodeSource: Send + 'static {
	fn draw(&mut self) -> InvitationCode;
}

/// Uniform draws over the 36-symbol alphabet.
#[derive(Debug)]
pub struct RandomCodes {
	rng: StdRng,
}

impl RandomCodes {
	/// Seeded from the operating system.
	pub fn new() -> Self {
		Self {
			rng: StdRng::from_os_rng(),
		}
	}

	/// Deterministic sequence, for reproducible runs.
	pub fn seeded(seed: u64) -> Self {
		Self {
			rng: StdRng::seed_from_u64(seed),
		}
	}
}

impl Default for RandomCodes {
	fn default() -> Self {
		Self::new()
	}
}

impl CodeSource for RandomCodes {
	fn draw(&mut self) -> InvitationCode {
		let mut symbols = [0u8; CODE_LEN];
		for symbol in &mut symbols {
			*symbol = ALPHABET[self.rng.random_range(0..ALPHABET.len())];
		}
		InvitationCode::from_symbols(symbols)
	}
}
