use std::sync::Arc;
use std::time::Duration;

use court_refresh::{VisibilityFlag, VisibilityPolicy};
use court_view::memory::query;
use court_view::{
	Amount, CardOptions, CourtBus, CourtEvent, ProposalCard, ProposalStatus, ProposalView, QueryError, Tone, UserVote,
	ViewState,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use crate::common::demo_fixture;

fn latest_view(surface: &court_view::RecordingSurface<ProposalView>) -> ProposalView {
	surface.ready_frames().pop().expect("card painted a proposal")
}

#[tokio::test]
async fn pending_card_paints_votes_and_arms_deadline() {
	let fx = demo_fixture::<ProposalView>();
	let card = ProposalCard::new(1, fx.client.clone(), fx.surface.clone(), &fx.bus, CardOptions::default());
	card.wait_idle().await;

	let view = latest_view(&fx.surface);
	let expiry = fx.court.snapshot().proposals[1].info.expiry_timestamp_ms;
	assert_eq!(view.status, ProposalStatus::Pending);
	assert_eq!(view.tone, Tone::Neutral);
	assert!(view.headline.starts_with("Voting period ends in 1m"), "{}", view.headline);
	assert_eq!(view.percent_for, "71.42%");
	assert_eq!(view.percent_against, "28.58%");
	assert_eq!(view.user_vote, UserVote::For(Amount(25_000)));
	assert_eq!(view.messages, vec!["Mint 50000 factory/sei1court/votes".to_string()]);
	assert!(view.can_vote);
	assert!(!view.can_finalize);
	assert_eq!(view.deadline_ms, Some(expiry));
	assert_eq!(card.deadline_ms(), Some(expiry));
	assert!(!card.is_finalized());
}

#[tokio::test(start_paused = true)]
async fn deadline_triggers_a_refresh() {
	let fx = demo_fixture::<ProposalView>();
	let card = ProposalCard::new(1, fx.client.clone(), fx.surface.clone(), &fx.bus, CardOptions::default());
	card.wait_idle().await;
	assert_eq!(card.stats().passes, 1);

	fx.court.update(|state| state.proposals[1].status = ProposalStatus::Passed);
	tokio::time::sleep(Duration::from_secs(91)).await;
	card.wait_idle().await;

	assert_eq!(card.stats().passes, 2);
	let view = latest_view(&fx.surface);
	assert_eq!(view.status, ProposalStatus::Passed);
	assert_eq!(view.tone, Tone::Info);
	assert!(view.can_finalize);
	let snapshot = fx.court.snapshot();
	let execution_end = snapshot.proposals[1].info.expiry_timestamp_ms
		+ u64::from(snapshot.config.execution_expiry_time_seconds) * 1000;
	assert_eq!(card.deadline_ms(), Some(execution_end));
}

#[tokio::test]
async fn finalized_card_ignores_transactions_until_network_changes() {
	let fx = demo_fixture::<ProposalView>();
	let card = ProposalCard::new(0, fx.client.clone(), fx.surface.clone(), &fx.bus, CardOptions::default());
	card.wait_idle().await;

	assert!(card.is_finalized());
	assert_eq!(card.deadline_ms(), None);
	assert_eq!(latest_view(&fx.surface).headline, "Proposal passed and executed.");
	assert_eq!(fx.court.query_count(query::PROPOSAL), 1);

	fx.bus.emit(&CourtEvent::TransactionConfirmed {
		chain_id: "atlantic-2".into(),
		sender: "sei1alice".into(),
	});
	assert_eq!(card.refresh(), None);
	card.wait_idle().await;
	assert_eq!(fx.court.query_count(query::PROPOSAL), 1);
	assert_eq!(card.stats().requests, 1);

	fx.bus.emit(&CourtEvent::DefaultNetworkChanged {
		chain_id: "pacific-1".into(),
	});
	card.wait_idle().await;
	assert_eq!(fx.court.query_count(query::PROPOSAL), 2);
	assert!(card.is_finalized());
}

/// Card 0 starts out executed. Its first pass reads the proposal at 50ms and
/// finishes at 100ms; the proposal changes at 55ms, after it was read.
async fn finalized_card_reloads_after(trigger: impl FnOnce(&ProposalCard, &CourtBus)) {
	let fx = demo_fixture::<ProposalView>();
	fx.court.set_latency(Duration::from_millis(50));
	let card = ProposalCard::new(0, fx.client.clone(), fx.surface.clone(), &fx.bus, CardOptions::default());

	tokio::time::sleep(Duration::from_millis(10)).await;
	trigger(&card, &fx.bus);
	tokio::time::sleep(Duration::from_millis(45)).await;
	fx.court.update(|state| state.proposals[0].status = ProposalStatus::Pending);
	card.wait_idle().await;

	assert_eq!(card.stats().passes, 2);
	assert_eq!(fx.court.query_count(query::PROPOSAL), 2);
	assert_eq!(latest_view(&fx.surface).status, ProposalStatus::Pending);
	assert!(!card.is_finalized());
}

#[tokio::test(start_paused = true)]
async fn network_change_during_a_finalizing_pass_still_reloads() {
	finalized_card_reloads_after(|_, bus| {
		bus.emit(&CourtEvent::DefaultNetworkChanged {
			chain_id: "pacific-1".into(),
		});
	})
	.await;
}

#[tokio::test(start_paused = true)]
async fn reload_during_a_finalizing_pass_still_reloads() {
	finalized_card_reloads_after(|card, _| {
		assert_eq!(card.reload(), court_refresh::RequestOutcome::Coalesced);
	})
	.await;
}

#[tokio::test]
async fn dropping_a_hidden_card_abandons_its_parked_pass() {
	let fx = demo_fixture::<ProposalView>();
	let flag = VisibilityFlag::new(false);
	let options = CardOptions {
		visibility: Arc::new(flag.clone()),
		policy: VisibilityPolicy {
			base: Duration::from_secs(3600),
			jitter: Duration::ZERO,
		},
		..CardOptions::default()
	};
	let card = ProposalCard::new(1, fx.client.clone(), fx.surface.clone(), &fx.bus, options);
	tokio::time::sleep(Duration::from_millis(20)).await;
	assert_eq!(card.stats().passes, 1);

	drop(card);
	assert_eq!(fx.bus.subscriber_count(), 0);
	flag.set(true);
	tokio::time::sleep(Duration::from_millis(50)).await;

	assert_eq!(fx.court.query_count(query::CONFIG), 0);
	assert_eq!(fx.court.query_count(query::PROPOSAL), 0);
	assert_eq!(fx.surface.frames(), vec![ViewState::Loading]);
}

#[tokio::test]
async fn missing_proposal_ends_the_pass_without_painting() {
	let fx = demo_fixture::<ProposalView>();
	let card = ProposalCard::new(7, fx.client.clone(), fx.surface.clone(), &fx.bus, CardOptions::default());
	card.wait_idle().await;

	assert_eq!(fx.surface.frames(), vec![ViewState::Loading]);
	assert_eq!(card.stats().passes, 1);
	assert_eq!(card.stats().failures, 0);
	assert!(!card.is_finalized());
}

#[tokio::test]
async fn latest_card_announces_the_next_proposal_once() {
	let fx = demo_fixture::<ProposalView>();
	let announced = Arc::new(Mutex::new(Vec::new()));
	let options = CardOptions {
		latest: true,
		on_newer: Some({
			let announced = Arc::clone(&announced);
			Arc::new(move |id: u32| announced.lock().push(id))
		}),
		..CardOptions::default()
	};
	let card = ProposalCard::new(1, fx.client.clone(), fx.surface.clone(), &fx.bus, options);
	card.wait_idle().await;

	assert_eq!(*announced.lock(), vec![2]);
	assert!(!card.is_latest());

	card.reload();
	card.wait_idle().await;
	assert_eq!(*announced.lock(), vec![2]);
	assert_eq!(fx.court.query_count(query::PROPOSAL_AMOUNT), 1);
}

#[tokio::test]
async fn failed_query_paints_error_and_keeps_refreshing() {
	let fx = demo_fixture::<ProposalView>();
	fx.court.fail_next(query::PROPOSAL, QueryError::Contract("out of gas".into()));
	let card = ProposalCard::new(2, fx.client.clone(), fx.surface.clone(), &fx.bus, CardOptions::default());
	card.wait_idle().await;
	assert_eq!(fx.surface.latest(), Some(ViewState::Failed("contract error: out of gas".into())));

	fx.bus.emit(&CourtEvent::DefaultProviderChanged);
	card.wait_idle().await;
	let view = latest_view(&fx.surface);
	assert_eq!(view.status, ProposalStatus::Passed);
	assert!(view.headline.starts_with("Proposal passed but has not been executed yet."));
}

#[tokio::test]
async fn hidden_card_waits_for_visibility_before_querying() {
	let fx = demo_fixture::<ProposalView>();
	let flag = VisibilityFlag::new(false);
	let options = CardOptions {
		visibility: Arc::new(flag.clone()),
		policy: VisibilityPolicy {
			base: Duration::from_secs(3600),
			jitter: Duration::ZERO,
		},
		..CardOptions::default()
	};
	let card = ProposalCard::new(1, fx.client.clone(), fx.surface.clone(), &fx.bus, options);

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(fx.court.query_count(query::PROPOSAL), 0);

	// Requests while parked fold into one follow-up.
	card.refresh();
	card.refresh();
	flag.set(true);
	tokio::time::timeout(Duration::from_secs(5), card.wait_idle())
		.await
		.expect("card should finish once visible");

	assert_eq!(card.stats().passes, 2);
	assert_eq!(fx.court.query_count(query::PROPOSAL), 2);
}
