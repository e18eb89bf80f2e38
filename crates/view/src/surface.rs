//! Render targets for views.
//!
//! A view never draws anything itself. Each pass ends by handing a
//! [`ViewState`] to its [`Surface`], which a frontend turns into pixels,
//! terminal lines or log records.

use std::fmt;

use court_refresh::PassFailure;
use parking_lot::Mutex;

use crate::error::ViewError;

/// What a view currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState<T> {
	/// A pass is fetching fresh data.
	Loading,
	Ready(T),
	/// The view needs an account and none is connected.
	NotConnected,
	/// The last pass failed. The next successful pass replaces this.
	Failed(String),
}

impl<T> ViewState<T> {
	pub fn ready(&self) -> Option<&T> {
		match self {
			Self::Ready(value) => Some(value),
			_ => None,
		}
	}
}

/// Receives every state a view paints, in order.
pub trait Surface<T>: Send + Sync + 'static {
	fn paint(&self, state: ViewState<T>);
}

impl<T, F> Surface<T> for F
where
	F: Fn(ViewState<T>) + Send + Sync + 'static,
{
	fn paint(&self, state: ViewState<T>) {
		self(state)
	}
}

/// Surface that keeps every painted frame.
pub struct RecordingSurface<T> {
	frames: Mutex<Vec<ViewState<T>>>,
}

impl<T> Default for RecordingSurface<T> {
	fn default() -> Self {
		Self {
			frames: Mutex::new(Vec::new()),
		}
	}
}

impl<T: Clone> RecordingSurface<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn frames(&self) -> Vec<ViewState<T>> {
		self.frames.lock().clone()
	}

	/// Most recently painted frame.
	pub fn latest(&self) -> Option<ViewState<T>> {
		self.frames.lock().last().cloned()
	}

	/// Frames painted with [`ViewState::Ready`], oldest first.
	pub fn ready_frames(&self) -> Vec<T> {
		self.frames.lock().iter().filter_map(|f| f.ready().cloned()).collect()
	}

	pub fn len(&self) -> usize {
		self.frames.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.frames.lock().is_empty()
	}
}

impl<T: Send + 'static> Surface<T> for RecordingSurface<T> {
	fn paint(&self, state: ViewState<T>) {
		self.frames.lock().push(state);
	}
}

impl<T> fmt::Debug for RecordingSurface<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RecordingSurface").field("frames", &self.frames.lock().len()).finish()
	}
}

/// Logs a failed pass and paints it.
pub(crate) fn paint_failure<T: 'static>(view: &str, surface: &dyn Surface<T>, failure: PassFailure<ViewError>) {
	tracing::warn!(view, error = %failure, "view.pass.failed");
	surface.paint(ViewState::Failed(failure.to_string()));
}
