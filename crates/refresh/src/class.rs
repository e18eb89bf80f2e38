/// Execution classes used for spawn tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Coordinator drivers and the passes they run.
	Refresh,
	/// Deadline timer wake-ups.
	Timer,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Refresh => "refresh",
			Self::Timer => "timer",
		}
	}
}
