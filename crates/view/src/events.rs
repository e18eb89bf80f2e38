use court_refresh::EventBus;

/// Process-wide notifications that make views stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourtEvent {
	/// The user switched networks.
	DefaultNetworkChanged { chain_id: String },
	/// The wallet provider changed, usually a connect or disconnect.
	DefaultProviderChanged,
	/// A transaction was confirmed on `chain_id`.
	TransactionConfirmed { chain_id: String, sender: String },
}

impl CourtEvent {
	/// True for events that change which network or account a view shows.
	pub fn is_context_change(&self) -> bool {
		matches!(self, Self::DefaultNetworkChanged { .. } | Self::DefaultProviderChanged)
	}
}

pub type CourtBus = EventBus<CourtEvent>;

/// Creates the bus views subscribe to.
pub fn court_bus() -> CourtBus {
	EventBus::new("court")
}
