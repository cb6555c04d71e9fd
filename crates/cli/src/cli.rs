use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "lyceum")]
#[command(about = "Inspect entitlement decisions and invitation codes offline")]
#[command(version)]
pub struct Cli {
	/// Configuration file (TOML); built-in defaults when omitted
	#[arg(long, short = 'c', global = true, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Verbose logging
	#[arg(long, short = 'v', global = true)]
	pub verbose: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Resolve the entitlement state of one account from a set of payment records
	Evaluate {
		/// JSON array of payment documents, each with an "id" field
		#[arg(long, value_name = "PATH")]
		records: PathBuf,

		/// Account creation time (RFC 3339)
		#[arg(long, value_name = "TIME")]
		created_at: DateTime<Utc>,

		/// Evaluation time (RFC 3339); the current time when omitted
		#[arg(long, value_name = "TIME")]
		now: Option<DateTime<Utc>>,

		/// Only consider records owned by this account
		#[arg(long, value_name = "ID")]
		account: Option<String>,
	},
	/// Invitation code utilities
	Code {
		#[command(subcommand)]
		action: CodeAction,
	},
}

#[derive(Subcommand, Debug)]
pub enum CodeAction {
	/// Print freshly drawn codes (not checked against any store)
	Draw {
		#[arg(long, short = 'n', default_value_t = 1)]
		count: usize,

		/// Seed for a reproducible sequence
		#[arg(long)]
		seed: Option<u64>,
	},
	/// Validate a code and print its normalized form
	Check { code: String },
}
