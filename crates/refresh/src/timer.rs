use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use slab::Slab;
use tokio_util::sync::CancellationToken;

use crate::TaskClass;

/// Milliseconds since the Unix epoch, the unit contract timestamps use.
pub fn unix_now_ms() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
		.unwrap_or(0)
}

/// Time left until `end_ms`, zero once it has passed.
pub fn remaining(end_ms: u64, now_ms: u64) -> Duration {
	Duration::from_millis(end_ms.saturating_sub(now_ms))
}

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Identifies a callback registered on a [`DeadlineTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(usize);

struct Armed {
	end_ms: u64,
	generation: u64,
	cancel: CancellationToken,
}

struct TimerInner {
	name: String,
	callbacks: Mutex<Slab<Callback>>,
	armed: Mutex<Option<Armed>>,
	generation: AtomicU64,
	fired: AtomicU64,
}

impl TimerInner {
	fn fire(&self, generation: u64) {
		let end_ms = {
			let mut armed = self.armed.lock();
			match armed.as_ref() {
				Some(current) if current.generation == generation => armed.take().map(|a| a.end_ms),
				_ => None,
			}
		};
		let Some(end_ms) = end_ms else {
			return;
		};

		self.fired.fetch_add(1, Ordering::Relaxed);
		let callbacks: Vec<Callback> = self.callbacks.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
		tracing::debug!(timer = %self.name, end_ms, callbacks = callbacks.len(), "timer.fired");
		for callback in &callbacks {
			callback();
		}
	}
}

/// Fires registered callbacks once when a deadline is reached.
///
/// Re-arming replaces the pending deadline; callbacks stay registered and
/// fire again for each deadline reached. Dropping the timer disarms it.
pub struct DeadlineTimer {
	inner: Arc<TimerInner>,
}

impl DeadlineTimer {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			inner: Arc::new(TimerInner {
				name: name.into(),
				callbacks: Mutex::new(Slab::new()),
				armed: Mutex::new(None),
				generation: AtomicU64::new(0),
				fired: AtomicU64::new(0),
			}),
		}
	}

	/// Registers a callback invoked each time a deadline is reached.
	pub fn add_callback(&self, callback: impl Fn() + Send + Sync + 'static) -> CallbackId {
		CallbackId(self.inner.callbacks.lock().insert(Arc::new(callback)))
	}

	/// Removes one callback. Returns false if it was already gone.
	pub fn remove_callback(&self, id: CallbackId) -> bool {
		self.inner.callbacks.lock().try_remove(id.0).is_some()
	}

	/// Arms the timer for an absolute Unix-millisecond deadline.
	///
	/// A deadline already in the past fires on the next tick.
	pub fn arm_at(&self, end_ms: u64) {
		let now = unix_now_ms();
		self.arm(end_ms, remaining(end_ms, now));
	}

	/// Arms the timer to fire after `delay`.
	pub fn arm_in(&self, delay: Duration) {
		let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
		self.arm(unix_now_ms().saturating_add(delay_ms), delay);
	}

	fn arm(&self, end_ms: u64, delay: Duration) {
		let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
		let cancel = CancellationToken::new();
		let previous = self.inner.armed.lock().replace(Armed {
			end_ms,
			generation,
			cancel: cancel.clone(),
		});
		if let Some(previous) = previous {
			previous.cancel.cancel();
		}

		tracing::trace!(timer = %self.inner.name, end_ms, delay_ms = delay.as_millis() as u64, "timer.armed");
		let inner = Arc::clone(&self.inner);
		crate::spawn(TaskClass::Timer, &self.inner.name, async move {
			tokio::select! {
				biased;
				_ = cancel.cancelled() => {}
				_ = tokio::time::sleep(delay) => inner.fire(generation),
			}
		});
	}

	/// Cancels the pending deadline, if any.
	pub fn disarm(&self) {
		if let Some(armed) = self.inner.armed.lock().take() {
			armed.cancel.cancel();
			tracing::trace!(timer = %self.inner.name, end_ms = armed.end_ms, "timer.disarmed");
		}
	}

	/// Pending deadline in Unix milliseconds.
	pub fn deadline_ms(&self) -> Option<u64> {
		self.inner.armed.lock().as_ref().map(|a| a.end_ms)
	}

	pub fn is_armed(&self) -> bool {
		self.inner.armed.lock().is_some()
	}

	/// How many deadlines have fired so far.
	pub fn fire_count(&self) -> u64 {
		self.inner.fired.load(Ordering::Relaxed)
	}
}

impl Drop for DeadlineTimer {
	fn drop(&mut self) {
		self.disarm();
	}
}

impl fmt::Debug for DeadlineTimer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DeadlineTimer")
			.field("name", &self.inner.name)
			.field("deadline_ms", &self.deadline_ms())
			.field("fired", &self.fire_count())
			.finish()
	}
}
