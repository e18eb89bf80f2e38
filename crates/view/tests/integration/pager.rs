use std::sync::Arc;
use std::time::Duration;

use court_refresh::{RequestOutcome, VisibilityFlag, VisibilityPolicy};
use court_view::memory::query;
use court_view::{
	CardSurfaces, CourtEvent, PagerOptions, ProposalList, ProposalListView, ProposalView, RecordingSurface, Surface,
};
use pretty_assertions::assert_eq;

use crate::common::{Fixture, demo_fixture};

fn card_surfaces() -> (Arc<RecordingSurface<ProposalView>>, CardSurfaces) {
	let recording = Arc::new(RecordingSurface::new());
	let shared = Arc::clone(&recording);
	let surfaces: CardSurfaces = Arc::new(move |_id: u32| Arc::clone(&shared) as Arc<dyn Surface<ProposalView>>);
	(recording, surfaces)
}

fn paged_list(fx: &Fixture<ProposalListView>, placeholder: &VisibilityFlag) -> ProposalList {
	let (_, surfaces) = card_surfaces();
	let options = PagerOptions {
		placeholder: Arc::new(placeholder.clone()),
		policy: VisibilityPolicy {
			base: Duration::from_secs(3600),
			jitter: Duration::ZERO,
		},
		..PagerOptions::new(surfaces)
	};
	ProposalList::with_pager(fx.client.clone(), fx.surface.clone(), &fx.bus, options)
}

#[tokio::test(start_paused = true)]
async fn pager_loads_newest_first_down_to_the_first_proposal() {
	let fx = demo_fixture::<ProposalListView>();
	let list = paged_list(&fx, &VisibilityFlag::new(true));
	list.wait_idle().await;

	assert_eq!(list.card_ids(), vec![2, 1, 0]);
	assert!(!list.has_older());
	let latest: Vec<bool> = list.cards().iter().map(|card| card.is_latest()).collect();
	assert_eq!(latest, vec![true, false, false]);

	// Nothing left to page in.
	assert_eq!(list.load_older(), Some(RequestOutcome::Started));
	list.wait_idle().await;
	assert_eq!(list.card_ids(), vec![2, 1, 0]);
}

#[tokio::test(start_paused = true)]
async fn hidden_placeholder_pauses_paging() {
	let fx = demo_fixture::<ProposalListView>();
	let placeholder = VisibilityFlag::new(false);
	let list = paged_list(&fx, &placeholder);

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert!(list.card_ids().is_empty());
	assert_eq!(fx.court.query_count(query::PROPOSAL_AMOUNT), 0);

	// Cards land at 50ms and 150ms; hiding at 200ms stops the walk at 250ms.
	placeholder.set(true);
	tokio::time::sleep(Duration::from_millis(150)).await;
	placeholder.set(false);
	list.wait_idle().await;
	assert_eq!(list.card_ids(), vec![2, 1]);
	assert!(list.has_older());

	assert_eq!(list.load_older(), Some(RequestOutcome::Started));
	tokio::time::sleep(Duration::from_millis(10)).await;
	assert_eq!(list.card_ids(), vec![2, 1]);

	placeholder.set(true);
	list.wait_idle().await;
	assert_eq!(list.card_ids(), vec![2, 1, 0]);
	assert!(!list.has_older());
}

#[tokio::test]
async fn newest_card_adds_proposals_created_later() {
	let fx = demo_fixture::<ProposalListView>();
	let (recording, surfaces) = card_surfaces();
	let options = PagerOptions {
		step: Duration::ZERO,
		..PagerOptions::new(surfaces)
	};
	let list = ProposalList::with_pager(fx.client.clone(), fx.surface.clone(), &fx.bus, options);
	list.wait_idle().await;
	for card in list.cards() {
		card.wait_idle().await;
	}
	assert_eq!(list.card_ids(), vec![2, 1, 0]);

	fx.court.update(|state| {
		let newest = state.proposals[1].clone();
		state.proposals.push(newest);
	});
	fx.bus.emit(&CourtEvent::TransactionConfirmed {
		chain_id: "atlantic-2".into(),
		sender: "sei1alice".into(),
	});
	for card in list.cards() {
		card.wait_idle().await;
	}

	assert_eq!(list.card_ids(), vec![3, 2, 1, 0]);
	let cards = list.cards();
	assert!(cards[0].is_latest());
	assert!(!cards[1].is_latest());

	cards[0].wait_idle().await;
	assert!(recording.ready_frames().iter().any(|view| view.id == 3));
}

#[tokio::test]
async fn list_without_pager_has_no_cards() {
	let fx = demo_fixture::<ProposalListView>();
	let list = ProposalList::new(fx.client.clone(), fx.surface.clone(), &fx.bus);
	list.wait_idle().await;

	assert_eq!(list.load_older(), None);
	assert!(list.card_ids().is_empty());
	assert!(!list.has_older());
}
