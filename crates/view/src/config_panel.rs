use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use court_refresh::{
	PassContext, PassFailure, RefreshCoordinator, RefreshPass, RefreshStats, RequestOutcome, Subscription, humanize_ms,
};

use crate::client::CourtClient;
use crate::error::ViewError;
use crate::events::{CourtBus, CourtEvent};
use crate::surface::{Surface, ViewState, paint_failure};
use crate::types::{Amount, CourtConfig};

/// Contract configuration with the absolute thresholds it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigView {
	pub votes_denom: String,
	pub total_supply: Amount,
	/// `None` when the contract administers itself, i.e. a new admin can
	/// only be installed through a proposal.
	pub admin: Option<String>,
	pub allow_new_proposals: bool,
	pub min_proposal_percent: u8,
	/// Staked votes needed to create a proposal.
	pub min_proposal_votes: Amount,
	pub min_turnout_percent: u8,
	/// Votes that must be cast for a proposal to be decided.
	pub min_turnout_votes: Amount,
	pub min_pass_percent: u8,
	pub voting_time: String,
	pub execution_window: String,
	pub last_config_change_ms: u64,
	/// Whether the connected account may use the admin actions.
	pub viewer_is_admin: bool,
}

impl ConfigView {
	/// Derives the panel contents from raw query results.
	pub fn derive(
		config: &CourtConfig,
		votes_denom: String,
		total_supply: Amount,
		contract: &str,
		viewer: Option<&str>,
	) -> Self {
		let seconds = |s: u32| humanize_ms(i64::from(s) * 1000, false);
		Self {
			votes_denom,
			total_supply,
			admin: (config.admin != contract).then(|| config.admin.clone()),
			allow_new_proposals: config.allow_new_proposals,
			min_proposal_percent: config.minimum_vote_proposal_percent,
			min_proposal_votes: total_supply.percent(config.minimum_vote_proposal_percent),
			min_turnout_percent: config.minimum_vote_turnout_percent,
			min_turnout_votes: total_supply.percent(config.minimum_vote_turnout_percent),
			min_pass_percent: config.minimum_vote_pass_percent,
			voting_time: seconds(config.max_proposal_expiry_time_seconds),
			execution_window: seconds(config.execution_expiry_time_seconds),
			last_config_change_ms: config.last_config_change_timestamp_ms,
			viewer_is_admin: viewer == Some(config.admin.as_str()),
		}
	}
}

struct ConfigPass {
	client: Arc<dyn CourtClient>,
	surface: Arc<dyn Surface<ConfigView>>,
}

#[async_trait]
impl RefreshPass for ConfigPass {
	type Error = ViewError;

	async fn run(&self, _cx: &PassContext) -> Result<(), ViewError> {
		let (denom, supply, config) = tokio::try_join!(
			self.client.query_denom(),
			self.client.query_total_supply(),
			self.client.query_config(),
		)?;
		let contract = self.client.contract_address();
		let viewer = self.client.account();
		let view = ConfigView::derive(&config, denom.votes, supply.votes, &contract, viewer.as_deref());
		self.surface.paint(ViewState::Ready(view));
		Ok(())
	}

	fn on_failure(&self, failure: PassFailure<ViewError>) {
		paint_failure("config", self.surface.as_ref(), failure);
	}
}

/// Contract configuration panel.
pub struct ConfigPanel {
	coordinator: RefreshCoordinator<ConfigPass>,
	_subscription: Subscription,
}

impl ConfigPanel {
	pub fn new(client: Arc<dyn CourtClient>, surface: Arc<dyn Surface<ConfigView>>, bus: &CourtBus) -> Self {
		let coordinator = RefreshCoordinator::new("config", ConfigPass { client, surface });
		let subscription = coordinator.subscribe_to(bus, CourtEvent::is_context_change);
		coordinator.pass().surface.paint(ViewState::Loading);
		coordinator.request();
		Self {
			coordinator,
			_subscription: subscription,
		}
	}

	/// Requests a refresh, e.g. after an admin action.
	pub fn refresh(&self) -> RequestOutcome {
		self.coordinator.request()
	}

	pub fn stats(&self) -> RefreshStats {
		self.coordinator.stats()
	}

	pub async fn wait_idle(&self) {
		self.coordinator.wait_idle().await;
	}
}

impl fmt::Debug for ConfigPanel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConfigPanel").field("coordinator", &self.coordinator).finish()
	}
}
