use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slab::Slab;

use crate::coordinator::{RefreshCoordinator, RefreshHandle, RefreshPass};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct BusInner<E> {
	name: String,
	handlers: Mutex<Slab<Handler<E>>>,
}

/// Synchronous publish/subscribe hub.
///
/// Handlers run on the emitting thread in subscription order. The handler
/// list is snapshotted before dispatch, so handlers may subscribe or drop
/// subscriptions while an event is being delivered.
pub struct EventBus<E> {
	inner: Arc<BusInner<E>>,
}

impl<E> Clone for EventBus<E> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<E: 'static> EventBus<E> {
	/// Creates an empty bus.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			inner: Arc::new(BusInner {
				name: name.into(),
				handlers: Mutex::new(Slab::new()),
			}),
		}
	}

	/// Registers `handler` until the returned guard is dropped.
	#[must_use = "dropping the subscription unsubscribes immediately"]
	pub fn subscribe(&self, handler: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
		let key = self.inner.handlers.lock().insert(Arc::new(handler));
		tracing::trace!(bus = %self.inner.name, key, "events.subscribe");
		let weak: Weak<BusInner<E>> = Arc::downgrade(&self.inner);
		Subscription {
			release: Some(Box::new(move || {
				if let Some(inner) = weak.upgrade() {
					inner.handlers.lock().try_remove(key);
					tracing::trace!(bus = %inner.name, key, "events.unsubscribe");
				}
			})),
		}
	}

	/// Delivers `event` to every live handler. Returns how many were called.
	pub fn emit(&self, event: &E) -> usize {
		let handlers: Vec<Handler<E>> = self.inner.handlers.lock().iter().map(|(_, h)| Arc::clone(h)).collect();
		tracing::trace!(bus = %self.inner.name, subscribers = handlers.len(), "events.emit");
		for handler in &handlers {
			handler(event);
		}
		handlers.len()
	}

	/// Number of live subscriptions.
	pub fn subscriber_count(&self) -> usize {
		self.inner.handlers.lock().len()
	}

	/// Requests a refresh on `handle` for every event matching `filter`.
	#[must_use = "dropping the subscription unsubscribes immediately"]
	pub fn bind(&self, handle: RefreshHandle, filter: impl Fn(&E) -> bool + Send + Sync + 'static) -> Subscription {
		self.subscribe(move |event| {
			if filter(event) {
				let outcome = handle.request();
				tracing::trace!(coordinator = handle.name(), ?outcome, "events.refresh");
			}
		})
	}
}

impl<E> fmt::Debug for EventBus<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventBus")
			.field("name", &self.inner.name)
			.field("subscribers", &self.inner.handlers.lock().len())
			.finish()
	}
}

impl<P: RefreshPass> RefreshCoordinator<P> {
	/// Wires this coordinator's `request()` to matching events on `bus`.
	///
	/// The subscription holds only a weak handle, so it never keeps the
	/// coordinator alive.
	#[must_use = "dropping the subscription unsubscribes immediately"]
	pub fn subscribe_to<E: 'static>(&self, bus: &EventBus<E>, filter: impl Fn(&E) -> bool + Send + Sync + 'static) -> Subscription {
		bus.bind(self.handle(), filter)
	}
}

/// Scoped registration on an [`EventBus`]. Dropping it unsubscribes.
pub struct Subscription {
	release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
	/// Unsubscribes now.
	pub fn cancel(mut self) {
		self.release_now();
	}

	fn release_now(&mut self) {
		if let Some(release) = self.release.take() {
			release();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.release_now();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").field("active", &self.release.is_some()).finish()
	}
}
