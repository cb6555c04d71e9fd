use std::fmt;
use std::str::FromStr;

use crate::{CodeError, Result};

/// Number of characters in a code.
pub const CODE_LEN: usize = 6;

/// Symbols a code is drawn from.
pub const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A validated, upper-case invitation code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvitationCode(String);

impl InvitationCode {
	/// Normalizes `input` to upper case and checks its shape.
	///
	/// Surrounding whitespace is ignored. No store access happens here, so a
	/// malformed code is always rejected before any lookup.
	pub fn parse(input: &str) -> Result<Self> {
		let normalized = input.trim().to_ascii_uppercase();
		let valid = normalized.len() == CODE_LEN && normalized.bytes().all(|b| ALPHABET.contains(&b));
		if !valid {
			return Err(CodeError::Validation(input.to_string()));
		}
		Ok(Self(normalized))
	}

	pub(crate) fn from_symbols(symbols: [u8; CODE_LEN]) -> Self {
		debug_assert!(symbols.iter().all(|b| ALPHABET.contains(b)));
		Self(symbols.iter().map(|&b| char::from(b)).collect())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for InvitationCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for InvitationCode {
	type Err = CodeError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}

impl AsRef<str> for InvitationCode {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

#[cfg(test)]
mod tests;
