use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use court_refresh::{PassContext, PassFailure, RefreshCoordinator, RefreshPass, RefreshStats, RequestOutcome, Subscription};

use crate::client::CourtClient;
use crate::error::ViewError;
use crate::events::CourtBus;
use crate::surface::{Surface, ViewState, paint_failure};
use crate::types::Amount;

/// Vote share balances of the connected account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingView {
	pub account: String,
	/// Vote share denom.
	pub denom: String,
	pub staked: Amount,
	/// Vote shares held in the bank module, free to stake.
	pub unstaked: Amount,
}

struct StakingPass {
	client: Arc<dyn CourtClient>,
	surface: Arc<dyn Surface<StakingView>>,
}

#[async_trait]
impl RefreshPass for StakingPass {
	type Error = ViewError;

	async fn run(&self, _cx: &PassContext) -> Result<(), ViewError> {
		self.surface.paint(ViewState::Loading);
		let Some(account) = self.client.account() else {
			self.surface.paint(ViewState::NotConnected);
			return Ok(());
		};

		let denom = self.client.query_denom().await?.votes;
		let (stats, unstaked) = tokio::try_join!(
			self.client.query_user_stats(&account),
			self.client.query_balance(&account, &denom),
		)?;
		self.surface.paint(ViewState::Ready(StakingView {
			account,
			denom,
			staked: stats.staked_votes,
			unstaked,
		}));
		Ok(())
	}

	fn on_failure(&self, failure: PassFailure<ViewError>) {
		paint_failure("staking", self.surface.as_ref(), failure);
	}
}

/// Staked and unstaked vote shares of the connected account.
///
/// Refreshes on every confirmed transaction as well as network and
/// provider changes, since staking moves shares between the two balances.
pub struct StakingBalances {
	coordinator: RefreshCoordinator<StakingPass>,
	_subscription: Subscription,
}

impl StakingBalances {
	pub fn new(client: Arc<dyn CourtClient>, surface: Arc<dyn Surface<StakingView>>, bus: &CourtBus) -> Self {
		let coordinator = RefreshCoordinator::new("staking", StakingPass { client, surface });
		let subscription = coordinator.subscribe_to(bus, |_| true);
		coordinator.request();
		Self {
			coordinator,
			_subscription: subscription,
		}
	}

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

impl fmt::Debug for StakingBalances {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StakingBalances").field("coordinator", &self.coordinator).finish()
	}
}
