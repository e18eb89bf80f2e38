//! Common utilities for view integration tests.

use std::sync::Arc;

use court_view::{CourtBus, CourtClient, CourtState, MemoryCourt, RecordingSurface, court_bus};

/// A memory court, the same court as a client, a bus, and a recording surface.
pub struct Fixture<T> {
	pub court: Arc<MemoryCourt>,
	pub client: Arc<dyn CourtClient>,
	pub bus: CourtBus,
	pub surface: Arc<RecordingSurface<T>>,
}

pub fn fixture<T: Clone + Send + 'static>(state: CourtState) -> Fixture<T> {
	let _ = tracing_subscriber::fmt::try_init();
	let court = Arc::new(MemoryCourt::new(state));
	Fixture {
		client: Arc::clone(&court) as Arc<dyn CourtClient>,
		court,
		bus: court_bus(),
		surface: Arc::new(RecordingSurface::new()),
	}
}

pub fn demo_fixture<T: Clone + Send + 'static>() -> Fixture<T> {
	fixture(CourtState::demo(court_refresh::unix_now_ms()))
}
