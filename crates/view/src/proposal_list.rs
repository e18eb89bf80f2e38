use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use court_refresh::{
	PassContext, PassFailure, Readiness, RefreshCoordinator, RefreshPass, RefreshStats, RequestOutcome, Subscription,
	Visibility, VisibilityPolicy, wait_until_visible,
};
use parking_lot::Mutex;

use crate::client::CourtClient;
use crate::error::ViewError;
use crate::events::{CourtBus, CourtEvent};
use crate::proposal::{CardOptions, NewerProposal, ProposalCard, ProposalView};
use crate::surface::{Surface, ViewState, paint_failure};
use crate::types::Amount;

/// Header of the proposal list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalListView {
	/// Whether the "new proposal" action is offered at all.
	pub can_create: bool,
}

/// Hands out the surface a newly created card paints into.
pub type CardSurfaces = Arc<dyn Fn(u32) -> Arc<dyn Surface<ProposalView>> + Send + Sync>;

/// How [`ProposalList::with_pager`] loads proposal cards.
#[derive(Clone)]
pub struct PagerOptions {
	/// Visibility of the "older proposals" placeholder at the end of the list.
	pub placeholder: Arc<dyn Visibility>,
	pub policy: VisibilityPolicy,
	/// Pause between two cards while the placeholder stays visible.
	pub step: Duration,
	/// Visibility gate handed to every card.
	pub card_visibility: Arc<dyn Visibility>,
	pub surfaces: CardSurfaces,
}

impl PagerOptions {
	pub fn new(surfaces: CardSurfaces) -> Self {
		Self {
			placeholder: Arc::new(|| true),
			policy: VisibilityPolicy::default(),
			step: Duration::from_millis(100),
			card_visibility: Arc::new(|| true),
			surfaces,
		}
	}
}

impl fmt::Debug for PagerOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PagerOptions")
			.field("policy", &self.policy)
			.field("step", &self.step)
			.finish_non_exhaustive()
	}
}

struct ListPass {
	client: Arc<dyn CourtClient>,
	surface: Arc<dyn Surface<ProposalListView>>,
}

#[async_trait]
impl RefreshPass for ListPass {
	type Error = ViewError;

	async fn run(&self, _cx: &PassContext) -> Result<(), ViewError> {
		let can_create = self.client.account().is_some();
		self.surface.paint(ViewState::Ready(ProposalListView { can_create }));
		Ok(())
	}

	fn on_failure(&self, failure: PassFailure<ViewError>) {
		paint_failure("proposal_list", self.surface.as_ref(), failure);
	}
}

/// Cards created so far, keyed by proposal id.
struct Deck {
	client: Arc<dyn CourtClient>,
	bus: CourtBus,
	options: PagerOptions,
	cards: Mutex<BTreeMap<u32, Arc<ProposalCard>>>,
	/// Lowest id handed out by the pager; `None` before the first page.
	oldest: Mutex<Option<u32>>,
}

impl Deck {
	/// Creates the card for `id` unless one already exists.
	fn add_card(self: &Arc<Self>, id: u32, latest: bool) {
		if self.cards.lock().contains_key(&id) {
			return;
		}
		let deck: Weak<Self> = Arc::downgrade(self);
		let on_newer: NewerProposal = Arc::new(move |next: u32| {
			if let Some(deck) = deck.upgrade() {
				deck.add_card(next, true);
			}
		});
		let card = ProposalCard::new(
			id,
			Arc::clone(&self.client),
			(self.options.surfaces)(id),
			&self.bus,
			CardOptions {
				latest,
				visibility: Arc::clone(&self.options.card_visibility),
				policy: self.options.policy,
				on_newer: Some(on_newer),
			},
		);
		tracing::debug!(proposal = id, latest, "view.proposal_list.card");
		self.cards.lock().entry(id).or_insert_with(|| Arc::new(card));
	}

	fn has_older(&self) -> bool {
		*self.oldest.lock() != Some(0)
	}
}

/// Walks proposal ids from the newest down while the placeholder is visible.
struct PagerPass {
	deck: Arc<Deck>,
}

#[async_trait]
impl RefreshPass for PagerPass {
	type Error = ViewError;

	async fn run(&self, cx: &PassContext) -> Result<(), ViewError> {
		let deck = &self.deck;
		let options = &deck.options;
		if !deck.has_older() {
			return Ok(());
		}
		if wait_until_visible(options.placeholder.as_ref(), &options.policy, cx).await == Readiness::Closed {
			return Ok(());
		}

		loop {
			let oldest = *deck.oldest.lock();
			let (id, latest) = match oldest {
				Some(0) => return Ok(()),
				Some(oldest) => (oldest - 1, false),
				None => {
					let amount = deck.client.query_proposal_amount().await?;
					let Some(newest) = amount.checked_sub(1) else {
						tracing::debug!("view.proposal_list.empty");
						return Ok(());
					};
					(newest, true)
				}
			};
			deck.add_card(id, latest);
			*deck.oldest.lock() = Some(id);
			if id == 0 {
				tracing::debug!("view.proposal_list.exhausted");
				return Ok(());
			}

			tokio::select! {
				_ = cx.closed() => return Ok(()),
				_ = tokio::time::sleep(options.step) => {}
			}
			if !options.placeholder.is_visible() {
				return Ok(());
			}
		}
	}
}

/// The proposal list: its header with the "new proposal" gate and,
/// optionally, the proposal cards it pages in.
pub struct ProposalList {
	coordinator: RefreshCoordinator<ListPass>,
	pager: Option<RefreshCoordinator<PagerPass>>,
	_subscription: Subscription,
}

impl ProposalList {
	/// Creates the header only.
	pub fn new(client: Arc<dyn CourtClient>, surface: Arc<dyn Surface<ProposalListView>>, bus: &CourtBus) -> Self {
		let coordinator = RefreshCoordinator::new("proposal-list", ListPass { client, surface });
		let subscription = coordinator.subscribe_to(bus, CourtEvent::is_context_change);
		coordinator.pass().surface.paint(ViewState::Loading);
		coordinator.request();
		Self {
			coordinator,
			pager: None,
			_subscription: subscription,
		}
	}

	/// Creates the header and starts paging in cards, newest first.
	///
	/// The newest card watches for proposals created later and adds them to
	/// the list itself. Older cards are added one per `step` while the
	/// placeholder is visible; once hidden, paging pauses until
	/// [`load_older`](Self::load_older) is called.
	pub fn with_pager(
		client: Arc<dyn CourtClient>,
		surface: Arc<dyn Surface<ProposalListView>>,
		bus: &CourtBus,
		options: PagerOptions,
	) -> Self {
		let deck = Arc::new(Deck {
			client: Arc::clone(&client),
			bus: bus.clone(),
			options,
			cards: Mutex::new(BTreeMap::new()),
			oldest: Mutex::new(None),
		});
		let pager = RefreshCoordinator::new("proposal-pager", PagerPass { deck });
		pager.request();
		Self {
			pager: Some(pager),
			..Self::new(client, surface, bus)
		}
	}

	pub fn refresh(&self) -> RequestOutcome {
		self.coordinator.request()
	}

	/// Resumes paging, e.g. when the placeholder scrolls into view.
	pub fn load_older(&self) -> Option<RequestOutcome> {
		self.pager.as_ref().map(RefreshCoordinator::request)
	}

	/// Whether proposals older than the loaded cards remain.
	pub fn has_older(&self) -> bool {
		self.pager.as_ref().is_some_and(|pager| pager.pass().deck.has_older())
	}

	/// Ids of the cards created so far, newest first.
	pub fn card_ids(&self) -> Vec<u32> {
		self.cards().iter().map(|card| card.id()).collect()
	}

	/// Cards created so far, newest first.
	pub fn cards(&self) -> Vec<Arc<ProposalCard>> {
		match &self.pager {
			Some(pager) => pager.pass().deck.cards.lock().values().rev().cloned().collect(),
			None => Vec::new(),
		}
	}

	/// Checks that the connected account has staked enough votes to create a
	/// proposal. Returns the required amount on success.
	pub async fn check_eligibility(&self) -> Result<Amount, ViewError> {
		let client = &self.coordinator.pass().client;
		let (supply, config) = tokio::try_join!(client.query_total_supply(), client.query_config())?;
		let required = supply.votes.percent(config.minimum_vote_proposal_percent);

		let Some(account) = client.account() else {
			return Err(ViewError::NotEnoughStakedVotes {
				required,
				staked: Amount::ZERO,
			});
		};
		let staked = client.query_user_stats(&account).await?.staked_votes;
		if staked < required {
			return Err(ViewError::NotEnoughStakedVotes { required, staked });
		}
		tracing::debug!(%account, %required, %staked, "view.proposal_list.eligible");
		Ok(required)
	}

	pub fn stats(&self) -> RefreshStats {
		self.coordinator.stats()
	}

	/// Pager counters, if paging is enabled.
	pub fn pager_stats(&self) -> Option<RefreshStats> {
		self.pager.as_ref().map(RefreshCoordinator::stats)
	}

	/// Resolves once the header and the pager are idle.
	pub async fn wait_idle(&self) {
		self.coordinator.wait_idle().await;
		if let Some(pager) = &self.pager {
			pager.wait_idle().await;
		}
	}
}

impl fmt::Debug for ProposalList {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProposalList")
			.field("coordinator", &self.coordinator)
			.field("pager", &self.pager)
			.field("cards", &self.card_ids())
			.finish()
	}
}
