use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::TaskClass;

/// Runtime for requests and timers armed from threads that are not inside
/// tokio, e.g. a frontend's event loop.
fn fallback_runtime() -> &'static Runtime {
	static FALLBACK: OnceLock<Runtime> = OnceLock::new();
	FALLBACK.get_or_init(|| {
		Builder::new_multi_thread()
			.worker_threads(1)
			.enable_time()
			.thread_name("court-refresh")
			.build()
			.expect("failed to build court-refresh fallback runtime")
	})
}

/// Spawns work on behalf of `owner`.
///
/// Uses the ambient runtime when there is one and the fallback runtime
/// otherwise, so `request()` stays a plain synchronous call. The task runs
/// inside a `refresh.task` span tagged with its class and owner.
pub fn spawn<F>(class: TaskClass, owner: &str, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	let span = tracing::debug_span!("refresh.task", class = class.as_str(), owner);
	let handle = Handle::try_current().unwrap_or_else(|_| fallback_runtime().handle().clone());
	handle.spawn(fut.instrument(span))
}
