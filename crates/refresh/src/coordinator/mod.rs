use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::context::PassContext;
use crate::panic::join_error_panic_message;
use crate::TaskClass;

/// Fetch-and-render work driven by a [`RefreshCoordinator`].
///
/// `run` is invoked once per pass and is the only place the owner's
/// presentation state should be written. It may suspend freely, including
/// waiting on readiness conditions; the coordinator counts the whole call as
/// one running pass.
#[async_trait]
pub trait RefreshPass: Send + Sync + 'static {
	type Error: fmt::Display + Send + 'static;

	async fn run(&self, cx: &PassContext) -> Result<(), Self::Error>;

	/// Receives pass failures. Sequencing continues regardless.
	fn on_failure(&self, failure: PassFailure<Self::Error>) {
		tracing::warn!(error = %failure, "refresh.pass.failed");
	}
}

/// Why a pass did not complete successfully.
#[derive(Debug, Error)]
pub enum PassFailure<E> {
	/// The pass returned an error.
	#[error("{0}")]
	Failed(E),
	/// The pass panicked.
	#[error("pass panicked: {0}")]
	Panicked(String),
	/// The pass task was torn down before it finished.
	#[error("pass task aborted: {0}")]
	Aborted(String),
}

/// What a call to [`RefreshCoordinator::request`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
	/// The coordinator was idle and a pass was scheduled.
	Started,
	/// A pass is in flight; one follow-up pass is now pending.
	Coalesced,
	/// The coordinator is closed and ignored the request.
	Closed,
}

/// Counters for one coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
	/// Calls to `request()`, including ignored ones.
	pub requests: u64,
	/// Requests that landed on a running coordinator.
	pub coalesced: u64,
	/// Passes started.
	pub passes: u64,
	/// Passes that ended in a [`PassFailure`].
	pub failures: u64,
}

#[derive(Debug, Default)]
struct Flags {
	running: bool,
	dirty: bool,
	closed: bool,
}

struct Shared<P> {
	name: String,
	pass: P,
	flags: Mutex<Flags>,
	idle: Notify,
	close: CancellationToken,
	requests: AtomicU64,
	coalesced: AtomicU64,
	passes: AtomicU64,
	failures: AtomicU64,
}

/// Type-erased request entry point used by [`RefreshHandle`].
trait Requester: Send + Sync {
	fn request(self: Arc<Self>) -> RequestOutcome;
}

impl<P: RefreshPass> Requester for Shared<P> {
	fn request(self: Arc<Self>) -> RequestOutcome {
		self.requests.fetch_add(1, Ordering::Relaxed);
		{
			let mut flags = self.flags.lock();
			if flags.closed {
				tracing::trace!(coordinator = %self.name, "refresh.request.closed");
				return RequestOutcome::Closed;
			}
			flags.dirty = true;
			if flags.running {
				self.coalesced.fetch_add(1, Ordering::Relaxed);
				tracing::trace!(coordinator = %self.name, "refresh.request.coalesced");
				return RequestOutcome::Coalesced;
			}
			flags.running = true;
		}
		tracing::trace!(coordinator = %self.name, "refresh.request.started");
		let owner = self.name.clone();
		crate::spawn(TaskClass::Refresh, &owner, drive(self));
		RequestOutcome::Started
	}
}

/// Ensures at most one refresh pass runs at a time for its owner.
///
/// Requests made while a pass is running set a dirty flag; when the pass
/// completes, exactly one more pass runs if the flag is set. Bursts of
/// requests therefore collapse into one follow-up pass, and the last pass
/// to render always started after the last request.
///
/// The coordinator is owned by one entity and closes when dropped. Use
/// [`RefreshCoordinator::handle`] to give event sources and timers a
/// non-owning way to call [`request`](Self::request).
pub struct RefreshCoordinator<P: RefreshPass> {
	shared: Arc<Shared<P>>,
}

impl<P: RefreshPass> RefreshCoordinator<P> {
	/// Creates an idle coordinator around `pass`.
	pub fn new(name: impl Into<String>, pass: P) -> Self {
		Self {
			shared: Arc::new(Shared {
				name: name.into(),
				pass,
				flags: Mutex::new(Flags::default()),
				idle: Notify::new(),
				close: CancellationToken::new(),
				requests: AtomicU64::new(0),
				coalesced: AtomicU64::new(0),
				passes: AtomicU64::new(0),
				failures: AtomicU64::new(0),
			}),
		}
	}

	/// Marks a refresh as wanted. Never blocks and never fails.
	///
	/// Starts a pass when idle; otherwise sets the dirty flag so the running
	/// pass chains exactly one more when it completes.
	pub fn request(&self) -> RequestOutcome {
		Arc::clone(&self.shared).request()
	}

	/// Returns a weak, cloneable request handle.
	pub fn handle(&self) -> RefreshHandle {
		let strong: Arc<dyn Requester> = Arc::clone(&self.shared) as Arc<dyn Requester>;
		RefreshHandle {
			name: Arc::from(self.shared.name.as_str()),
			inner: Arc::downgrade(&strong),
		}
	}

	/// Coordinator name used in logs.
	pub fn name(&self) -> &str {
		&self.shared.name
	}

	/// Returns the wrapped pass.
	pub fn pass(&self) -> &P {
		&self.shared.pass
	}

	/// Returns true while a pass is executing or about to start.
	pub fn is_running(&self) -> bool {
		self.shared.flags.lock().running
	}

	/// Returns true when a follow-up pass is pending.
	pub fn is_dirty(&self) -> bool {
		self.shared.flags.lock().dirty
	}

	/// Returns true once [`close`](Self::close) has been called.
	pub fn is_closed(&self) -> bool {
		self.shared.flags.lock().closed
	}

	/// Snapshot of the request and pass counters.
	pub fn stats(&self) -> RefreshStats {
		RefreshStats {
			requests: self.shared.requests.load(Ordering::Relaxed),
			coalesced: self.shared.coalesced.load(Ordering::Relaxed),
			passes: self.shared.passes.load(Ordering::Relaxed),
			failures: self.shared.failures.load(Ordering::Relaxed),
		}
	}

	/// Resolves once no pass is running.
	pub async fn wait_idle(&self) {
		loop {
			// Create Notified before checking so a concurrent notify_waiters is not lost.
			let notified = self.shared.idle.notified();
			if !self.shared.flags.lock().running {
				return;
			}
			notified.await;
		}
	}

	/// Stops accepting requests and signals [`PassContext::closed`].
	///
	/// A pass already running is left to finish; no further pass is chained.
	pub fn close(&self) {
		self.shared.flags.lock().closed = true;
		self.shared.close.cancel();
		tracing::debug!(coordinator = %self.shared.name, "refresh.closed");
	}
}

impl<F, Fut, E> RefreshCoordinator<FnPass<F>>
where
	F: Fn(PassContext) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<(), E>> + Send + 'static,
	E: fmt::Display + Send + 'static,
{
	/// Creates a coordinator from an async closure. Failures are logged.
	pub fn from_fn(name: impl Into<String>, f: F) -> Self {
		Self::new(name, FnPass { f })
	}
}

impl<P: RefreshPass> Drop for RefreshCoordinator<P> {
	fn drop(&mut self) {
		self.close();
	}
}

impl<P: RefreshPass> fmt::Debug for RefreshCoordinator<P> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let flags = self.shared.flags.lock();
		f.debug_struct("RefreshCoordinator")
			.field("name", &self.shared.name)
			.field("running", &flags.running)
			.field("dirty", &flags.dirty)
			.field("closed", &flags.closed)
			.finish()
	}
}

/// [`RefreshPass`] adapter for async closures.
pub struct FnPass<F> {
	f: F,
}

#[async_trait]
impl<F, Fut, E> RefreshPass for FnPass<F>
where
	F: Fn(PassContext) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<(), E>> + Send + 'static,
	E: fmt::Display + Send + 'static,
{
	type Error = E;

	async fn run(&self, cx: &PassContext) -> Result<(), E> {
		(self.f)(cx.clone()).await
	}
}

/// Non-owning handle that can request refreshes.
///
/// Requests through a handle whose coordinator is gone return
/// [`RequestOutcome::Closed`].
#[derive(Clone)]
pub struct RefreshHandle {
	name: Arc<str>,
	inner: Weak<dyn Requester>,
}

impl RefreshHandle {
	/// Same as [`RefreshCoordinator::request`].
	pub fn request(&self) -> RequestOutcome {
		match self.inner.upgrade() {
			Some(requester) => requester.request(),
			None => RequestOutcome::Closed,
		}
	}

	/// Name of the coordinator this handle points at.
	pub fn name(&self) -> &str {
		&self.name
	}
}

impl fmt::Debug for RefreshHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RefreshHandle").field("name", &self.name).finish_non_exhaustive()
	}
}

/// Clears `running` if the driver is dropped mid-pass (runtime shutdown).
struct RunningGuard<'a, P> {
	shared: &'a Shared<P>,
	armed: bool,
}

impl<P> Drop for RunningGuard<'_, P> {
	fn drop(&mut self) {
		if self.armed {
			self.shared.flags.lock().running = false;
			self.shared.idle.notify_waiters();
		}
	}
}

async fn drive<P: RefreshPass>(shared: Arc<Shared<P>>) {
	let mut guard = RunningGuard {
		shared: &shared,
		armed: true,
	};

	loop {
		let pass = {
			let mut flags = shared.flags.lock();
			if flags.closed {
				flags.running = false;
				break;
			}
			flags.dirty = false;
			shared.passes.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
		};

		tracing::debug!(coordinator = %shared.name, pass, "refresh.pass.start");
		let cx = PassContext::new(pass, shared.close.child_token());
		let runner = Arc::clone(&shared);
		let child = crate::spawn(TaskClass::Refresh, &shared.name, async move { runner.pass.run(&cx).await });
		let failure = match child.await {
			Ok(Ok(())) => None,
			Ok(Err(err)) => Some(PassFailure::Failed(err)),
			Err(err) if err.is_cancelled() => Some(PassFailure::Aborted(err.to_string())),
			Err(err) => Some(PassFailure::Panicked(
				join_error_panic_message(err).unwrap_or_else(|| "unknown panic".to_string()),
			)),
		};

		match failure {
			None => tracing::debug!(coordinator = %shared.name, pass, "refresh.pass.done"),
			Some(failure) => {
				shared.failures.fetch_add(1, Ordering::Relaxed);
				tracing::debug!(coordinator = %shared.name, pass, "refresh.pass.failure");
				shared.pass.on_failure(failure);
			}
		}

		// Chain or go idle under one lock so a request racing the exit is never lost.
		let chained = {
			let mut flags = shared.flags.lock();
			if flags.dirty && !flags.closed {
				true
			} else {
				flags.running = false;
				false
			}
		};
		if !chained {
			break;
		}
	}

	guard.armed = false;
	shared.idle.notify_waiters();
}
