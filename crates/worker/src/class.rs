/// Execution classes used for spawn logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Long-lived watch loops whose output gates what the user can open.
	Interactive,
	/// Timers and best-effort side effects that may lag without visible harm.
	Background,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
		}
	}
}
