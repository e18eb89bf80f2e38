use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;

use crate::context::PassContext;

/// Readiness predicate a pass can wait on before doing expensive work.
pub trait Visibility: Send + Sync {
	fn is_visible(&self) -> bool;

	/// Optional wake-up source signalled when visibility may have changed.
	///
	/// Without one, waiters fall back to polling.
	fn changed(&self) -> Option<&Notify> {
		None
	}
}

impl<F> Visibility for F
where
	F: Fn() -> bool + Send + Sync,
{
	fn is_visible(&self) -> bool {
		self()
	}
}

#[derive(Debug, Default)]
struct FlagInner {
	visible: AtomicBool,
	changed: Notify,
}

/// Shared on/off visibility switch that wakes waiters when it flips on.
#[derive(Debug, Clone, Default)]
pub struct VisibilityFlag {
	inner: Arc<FlagInner>,
}

impl VisibilityFlag {
	/// Creates a flag with the given initial state.
	pub fn new(visible: bool) -> Self {
		let flag = Self::default();
		flag.inner.visible.store(visible, Ordering::Release);
		flag
	}

	/// Updates the flag, waking any waiters.
	pub fn set(&self, visible: bool) {
		self.inner.visible.store(visible, Ordering::Release);
		self.inner.changed.notify_waiters();
	}
}

impl Visibility for VisibilityFlag {
	fn is_visible(&self) -> bool {
		self.inner.visible.load(Ordering::Acquire)
	}

	fn changed(&self) -> Option<&Notify> {
		Some(&self.inner.changed)
	}
}

/// Poll cadence for [`wait_until_visible`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityPolicy {
	/// Minimum delay between visibility checks.
	pub base: Duration,
	/// Upper bound of the uniform random delay added to `base`.
	pub jitter: Duration,
}

impl Default for VisibilityPolicy {
	fn default() -> Self {
		Self {
			base: Duration::from_millis(1000),
			jitter: Duration::from_millis(2000),
		}
	}
}

impl VisibilityPolicy {
	/// Picks the next poll delay.
	pub fn next_delay(&self) -> Duration {
		let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
		if jitter_ms == 0 {
			return self.base;
		}
		self.base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
	}
}

/// Result of waiting for visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
	Ready,
	/// The owning coordinator closed while waiting.
	Closed,
}

/// Parks the current pass until `visibility` reports visible.
///
/// Spreads checks out with jitter so many off-screen owners do not poll in
/// lockstep. Returns early with [`Readiness::Closed`] once the owning
/// coordinator closes.
pub async fn wait_until_visible<V>(visibility: &V, policy: &VisibilityPolicy, cx: &PassContext) -> Readiness
where
	V: Visibility + ?Sized,
{
	let mut polls = 0u32;
	loop {
		// Register for wake-ups before checking to avoid a lost notification.
		let changed = visibility.changed().map(Notify::notified);
		if visibility.is_visible() {
			if polls > 0 {
				tracing::trace!(pass = cx.pass(), polls, "refresh.visibility.ready");
			}
			return Readiness::Ready;
		}
		if cx.is_closed() {
			return Readiness::Closed;
		}

		polls = polls.saturating_add(1);
		let delay = policy.next_delay();
		tokio::select! {
			biased;
			_ = cx.closed() => return Readiness::Closed,
			_ = async {
				match changed {
					Some(notified) => notified.await,
					None => std::future::pending::<()>().await,
				}
			} => {}
			_ = tokio::time::sleep(delay) => {}
		}
	}
}
