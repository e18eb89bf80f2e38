use std::time::Duration;

use court_view::memory::query;
use court_view::{
	Amount, ConfigPanel, ConfigView, CourtEvent, CourtState, ProposalList, ProposalListView, QueryError, StakingBalances,
	StakingView, ViewError, ViewState,
};
use pretty_assertions::assert_eq;

use crate::common::{demo_fixture, fixture};

#[tokio::test]
async fn staking_waits_for_an_account_then_follows_provider_changes() {
	let fx = fixture::<StakingView>(CourtState::empty());
	let staking = StakingBalances::new(fx.client.clone(), fx.surface.clone(), &fx.bus);
	staking.wait_idle().await;

	assert_eq!(fx.surface.frames(), vec![ViewState::Loading, ViewState::NotConnected]);
	assert_eq!(fx.court.query_count(query::DENOM), 0);

	fx.court.update(|state| {
		state.account = Some("sei1bob".into());
		state.stakes.insert("sei1bob".into(), Amount(40));
		state.balances.insert(("sei1bob".into(), state.denom.clone()), Amount(2));
	});
	fx.bus.emit(&CourtEvent::DefaultProviderChanged);
	staking.wait_idle().await;

	assert_eq!(
		fx.surface.latest(),
		Some(ViewState::Ready(StakingView {
			account: "sei1bob".into(),
			denom: "factory/sei1court/votes".into(),
			staked: Amount(40),
			unstaked: Amount(2),
		}))
	);
}

#[tokio::test]
async fn staking_refreshes_after_confirmed_transactions() {
	let fx = demo_fixture::<StakingView>();
	let staking = StakingBalances::new(fx.client.clone(), fx.surface.clone(), &fx.bus);
	staking.wait_idle().await;
	assert_eq!(fx.surface.ready_frames().last().map(|v| v.staked), Some(Amount(25_000)));

	fx.court.update(|state| {
		state.stakes.insert("sei1alice".into(), Amount(30_000));
	});
	fx.bus.emit(&CourtEvent::TransactionConfirmed {
		chain_id: "atlantic-2".into(),
		sender: "sei1alice".into(),
	});
	staking.wait_idle().await;

	assert_eq!(fx.surface.ready_frames().last().map(|v| v.staked), Some(Amount(30_000)));
	assert_eq!(staking.stats().passes, 2);
}

#[tokio::test]
async fn failed_pass_paints_error_and_next_pass_recovers() {
	let fx = demo_fixture::<ConfigView>();
	fx.court.fail_next(query::CONFIG, QueryError::Transport("node unreachable".into()));

	let panel = ConfigPanel::new(fx.client.clone(), fx.surface.clone(), &fx.bus);
	panel.wait_idle().await;
	assert_eq!(
		fx.surface.frames(),
		vec![ViewState::Loading, ViewState::Failed("transport error: node unreachable".into())]
	);
	assert_eq!(panel.stats().failures, 1);

	panel.refresh();
	panel.wait_idle().await;

	let view = fx.surface.latest().and_then(|s| s.ready().cloned()).expect("config painted");
	assert_eq!(view.min_proposal_votes, Amount(10_000));
	assert_eq!(view.min_turnout_votes, Amount(200_000));
	assert_eq!(view.admin, None);
	assert_eq!(view.voting_time, "1w");
	assert_eq!(panel.stats().failures, 1);
}

#[tokio::test(start_paused = true)]
async fn event_burst_during_a_pass_collapses_into_one_followup() {
	let fx = demo_fixture::<ConfigView>();
	fx.court.set_latency(Duration::from_millis(50));

	let panel = ConfigPanel::new(fx.client.clone(), fx.surface.clone(), &fx.bus);
	tokio::time::sleep(Duration::from_millis(10)).await;
	for _ in 0..10 {
		fx.bus.emit(&CourtEvent::DefaultNetworkChanged {
			chain_id: "pacific-1".into(),
		});
	}
	// Not a context change; the config panel ignores it.
	fx.bus.emit(&CourtEvent::TransactionConfirmed {
		chain_id: "pacific-1".into(),
		sender: "sei1alice".into(),
	});
	panel.wait_idle().await;

	let stats = panel.stats();
	assert_eq!(stats.requests, 11);
	assert_eq!(stats.coalesced, 10);
	assert_eq!(stats.passes, 2);
	assert_eq!(fx.court.query_count(query::CONFIG), 2);
	assert_eq!(fx.surface.ready_frames().len(), 2);
}

#[tokio::test]
async fn proposal_list_gates_creation_on_account_and_stake() {
	let fx = demo_fixture::<ProposalListView>();
	let list = ProposalList::new(fx.client.clone(), fx.surface.clone(), &fx.bus);
	list.wait_idle().await;
	assert_eq!(fx.surface.latest(), Some(ViewState::Ready(ProposalListView { can_create: true })));

	assert_eq!(list.check_eligibility().await, Ok(Amount(10_000)));

	fx.court.update(|state| {
		state.stakes.insert("sei1alice".into(), Amount(9_999));
	});
	assert_eq!(
		list.check_eligibility().await,
		Err(ViewError::NotEnoughStakedVotes {
			required: Amount(10_000),
			staked: Amount(9_999),
		})
	);

	fx.court.update(|state| state.account = None);
	fx.bus.emit(&CourtEvent::DefaultProviderChanged);
	list.wait_idle().await;
	assert_eq!(fx.surface.latest(), Some(ViewState::Ready(ProposalListView { can_create: false })));
	assert_eq!(
		list.check_eligibility().await,
		Err(ViewError::NotEnoughStakedVotes {
			required: Amount(10_000),
			staked: Amount::ZERO,
		})
	);
}

#[tokio::test]
async fn dropping_a_view_unsubscribes_it() {
	let fx = demo_fixture::<ConfigView>();
	let panel = ConfigPanel::new(fx.client.clone(), fx.surface.clone(), &fx.bus);
	assert_eq!(fx.bus.subscriber_count(), 1);

	panel.wait_idle().await;
	drop(panel);
	assert_eq!(fx.bus.subscriber_count(), 0);
	assert_eq!(fx.bus.emit(&CourtEvent::DefaultProviderChanged), 0);
}
