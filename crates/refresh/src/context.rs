use tokio_util::sync::CancellationToken;

/// Context handed to each refresh pass.
///
/// Carries the pass number and a view of the owning coordinator's teardown
/// signal. Closing never aborts a running pass; callbacks that park on a
/// readiness condition can watch [`PassContext::closed`] to bail out early.
#[derive(Debug, Clone)]
pub struct PassContext {
	pass: u64,
	closed: CancellationToken,
}

impl PassContext {
	pub(crate) fn new(pass: u64, closed: CancellationToken) -> Self {
		Self { pass, closed }
	}

	/// Creates a context that is not tied to any coordinator.
	///
	/// Useful for driving a pass body by hand, e.g. in tests.
	pub fn detached(pass: u64) -> Self {
		Self::new(pass, CancellationToken::new())
	}

	/// Returns the 1-based pass number within the owning coordinator.
	pub const fn pass(&self) -> u64 {
		self.pass
	}

	/// Returns true once the owning coordinator has been closed.
	pub fn is_closed(&self) -> bool {
		self.closed.is_cancelled()
	}

	/// Resolves when the owning coordinator is closed.
	pub async fn closed(&self) {
		self.closed.cancelled().await;
	}
}
