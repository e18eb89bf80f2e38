use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use court_refresh::{
	DeadlineTimer, PassContext, PassFailure, Readiness, RefreshCoordinator, RefreshPass, RefreshStats, RequestOutcome,
	Subscription, Visibility, VisibilityPolicy, humanize_ms, unix_now_ms, wait_until_visible,
};

use crate::client::CourtClient;
use crate::error::ViewError;
use crate::events::CourtBus;
use crate::surface::{Surface, ViewState, paint_failure};
use crate::types::{Amount, CourtConfig, Proposal, ProposalStatus};

/// Called with the next proposal id once the latest card learns a newer
/// proposal exists.
pub type NewerProposal = Arc<dyn Fn(u32) + Send + Sync>;

/// Emphasis a frontend should give the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
	Neutral,
	Info,
	Success,
	Warning,
	Danger,
}

/// How the connected account voted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserVote {
	NoAccount,
	NotVoted,
	For(Amount),
	Against(Amount),
}

impl fmt::Display for UserVote {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NoAccount | Self::NotVoted => f.write_str("You didn't vote on this"),
			Self::For(shares) => write!(f, "You voted for this proposal with {shares} shares."),
			Self::Against(shares) => write!(f, "You voted against this proposal with {shares} shares."),
		}
	}
}

/// Everything a proposal card displays.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalView {
	pub id: u32,
	pub status: ProposalStatus,
	pub tone: Tone,
	pub headline: String,
	/// When the status is next expected to change on its own.
	pub deadline_ms: Option<u64>,
	pub proposer: String,
	pub messages: Vec<String>,
	pub votes_for: Amount,
	pub votes_against: Amount,
	pub percent_for: String,
	pub percent_against: String,
	pub user_vote: UserVote,
	pub can_vote: bool,
	pub can_finalize: bool,
}

/// Formats a permyriad as a percentage with two decimals.
fn permyriad_percent(permyriad: u128) -> String {
	format!("{}.{:02}%", permyriad / 100, permyriad % 100)
}

/// Splits the opinionated votes into for/against percentages.
///
/// With no votes cast both sides read `0.00%`.
pub fn vote_split(votes_for: Amount, votes_against: Amount) -> (String, String) {
	let total = votes_for.get().saturating_add(votes_against.get());
	if total == 0 {
		return (permyriad_percent(0), permyriad_percent(0));
	}
	let permyriad_for = votes_for.get().saturating_mul(10_000) / total;
	(permyriad_percent(permyriad_for), permyriad_percent(10_000 - permyriad_for))
}

fn headline(proposal: &Proposal, config: &CourtConfig, now_ms: u64) -> (Tone, String) {
	let countdown = |end_ms: u64| {
		let left = i64::try_from(end_ms.saturating_sub(now_ms)).unwrap_or(i64::MAX);
		humanize_ms(left, false)
	};
	match proposal.status {
		ProposalStatus::Cancelled => (Tone::Danger, "Proposal cancelled.".to_string()),
		ProposalStatus::Executed => (Tone::Success, "Proposal passed and executed.".to_string()),
		ProposalStatus::ExecutionExpired => (
			Tone::Warning,
			"Proposal passed but expired before it could be executed. \
			 Finalizing this proposal will result in it being marked as cancelled."
				.to_string(),
		),
		ProposalStatus::Passed => {
			let end = proposal.deadline_ms(config).unwrap_or(proposal.info.expiry_timestamp_ms);
			(
				Tone::Info,
				format!("Proposal passed but has not been executed yet. Expires in {}", countdown(end)),
			)
		}
		ProposalStatus::Pending => (
			Tone::Neutral,
			format!("Voting period ends in {}", countdown(proposal.info.expiry_timestamp_ms)),
		),
		ProposalStatus::Rejected => (Tone::Danger, "Proposal rejected.".to_string()),
	}
}

/// Options for [`ProposalCard::new`].
#[derive(Clone)]
pub struct CardOptions {
	/// Whether this card shows the newest known proposal.
	pub latest: bool,
	/// Gate checked before each pass fetches anything.
	pub visibility: Arc<dyn Visibility>,
	pub policy: VisibilityPolicy,
	pub on_newer: Option<NewerProposal>,
}

impl Default for CardOptions {
	fn default() -> Self {
		Self {
			latest: false,
			visibility: Arc::new(|| true),
			policy: VisibilityPolicy::default(),
			on_newer: None,
		}
	}
}

impl fmt::Debug for CardOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CardOptions")
			.field("latest", &self.latest)
			.field("policy", &self.policy)
			.field("on_newer", &self.on_newer.is_some())
			.finish_non_exhaustive()
	}
}

struct CardPass {
	id: u32,
	client: Arc<dyn CourtClient>,
	surface: Arc<dyn Surface<ProposalView>>,
	visibility: Arc<dyn Visibility>,
	policy: VisibilityPolicy,
	latest: AtomicBool,
	on_newer: Option<NewerProposal>,
	finalized: Arc<AtomicBool>,
	timer: DeadlineTimer,
}

impl CardPass {
	/// Hands the next id to `on_newer` once, if the contract has moved past us.
	async fn check_newer(&self) -> Result<(), ViewError> {
		if !self.latest.load(Ordering::Acquire) {
			return Ok(());
		}
		let amount = self.client.query_proposal_amount().await?;
		if amount.saturating_sub(1) > self.id && self.latest.swap(false, Ordering::AcqRel) {
			tracing::debug!(proposal = self.id, amount, "view.proposal.newer");
			if let Some(on_newer) = &self.on_newer {
				on_newer(self.id + 1);
			}
		}
		Ok(())
	}

	async fn user_vote(&self) -> Result<UserVote, ViewError> {
		let Some(account) = self.client.account() else {
			return Ok(UserVote::NoAccount);
		};
		let info = self.client.query_user_vote(self.id, &account).await?;
		Ok(match info {
			info if info.active_votes == Amount::ZERO => UserVote::NotVoted,
			info if info.voted_for => UserVote::For(info.active_votes),
			info => UserVote::Against(info.active_votes),
		})
	}
}

#[async_trait]
impl RefreshPass for CardPass {
	type Error = ViewError;

	async fn run(&self, cx: &PassContext) -> Result<(), ViewError> {
		if wait_until_visible(self.visibility.as_ref(), &self.policy, cx).await == Readiness::Closed {
			return Ok(());
		}

		let ((), config, proposal) = tokio::try_join!(
			self.check_newer(),
			async { Ok::<_, ViewError>(self.client.query_config().await?) },
			async { Ok::<_, ViewError>(self.client.query_proposal(self.id).await?) },
		)?;
		let Some(proposal) = proposal else {
			tracing::debug!(proposal = self.id, "view.proposal.missing");
			return Ok(());
		};

		let finalized = proposal.status.is_finalized();
		self.finalized.store(finalized, Ordering::Release);

		let now = unix_now_ms();
		let deadline_ms = proposal.deadline_ms(&config);
		match deadline_ms {
			Some(end) if !finalized && end > now => self.timer.arm_at(end),
			_ => self.timer.disarm(),
		}

		let user_vote = self.user_vote().await?;
		let (tone, headline) = headline(&proposal, &config, now);
		let (percent_for, percent_against) = vote_split(proposal.info.votes_for, proposal.info.votes_against);
		let view = ProposalView {
			id: self.id,
			status: proposal.status,
			tone,
			headline,
			deadline_ms,
			proposer: proposal.info.proposer.clone(),
			messages: proposal.messages.iter().map(|m| m.describe()).collect(),
			votes_for: proposal.info.votes_for,
			votes_against: proposal.info.votes_against,
			percent_for,
			percent_against,
			user_vote,
			can_vote: proposal.status == ProposalStatus::Pending && now < proposal.info.expiry_timestamp_ms,
			can_finalize: matches!(proposal.status, ProposalStatus::Passed | ProposalStatus::ExecutionExpired),
		};
		self.surface.paint(ViewState::Ready(view));
		Ok(())
	}

	fn on_failure(&self, failure: PassFailure<ViewError>) {
		paint_failure("proposal", self.surface.as_ref(), failure);
	}
}

/// One proposal, kept current until it is finalized.
///
/// Refreshes when the network, wallet provider or any transaction changes
/// the world, and when its voting or execution deadline passes. Once the
/// proposal is executed or cancelled, transaction and deadline triggers are
/// ignored; a network or provider change still reloads it because the id
/// may now name a different proposal.
///
/// The finalized flag only filters incoming triggers. A pass that was
/// requested always runs, so a reload that lands while an older pass is
/// still reading the previous network is never swallowed.
pub struct ProposalCard {
	coordinator: RefreshCoordinator<CardPass>,
	finalized: Arc<AtomicBool>,
	_subscription: Subscription,
}

impl ProposalCard {
	/// Creates the card and starts its first pass.
	pub fn new(
		id: u32,
		client: Arc<dyn CourtClient>,
		surface: Arc<dyn Surface<ProposalView>>,
		bus: &CourtBus,
		options: CardOptions,
	) -> Self {
		let finalized = Arc::new(AtomicBool::new(false));
		let coordinator = RefreshCoordinator::new(
			format!("proposal-{id}"),
			CardPass {
				id,
				client,
				surface,
				visibility: options.visibility,
				policy: options.policy,
				latest: AtomicBool::new(options.latest),
				on_newer: options.on_newer,
				finalized: Arc::clone(&finalized),
				timer: DeadlineTimer::new(format!("proposal-{id}")),
			},
		);

		let handle = coordinator.handle();
		coordinator.pass().timer.add_callback(move || {
			handle.request();
		});

		let subscription = {
			let handle = coordinator.handle();
			let finalized = Arc::clone(&finalized);
			bus.subscribe(move |event| {
				if event.is_context_change() {
					finalized.store(false, Ordering::Release);
				} else if finalized.load(Ordering::Acquire) {
					tracing::trace!(coordinator = handle.name(), "view.proposal.finalized");
					return;
				}
				handle.request();
			})
		};

		coordinator.pass().surface.paint(ViewState::Loading);
		coordinator.request();
		Self {
			coordinator,
			finalized,
			_subscription: subscription,
		}
	}

	pub fn id(&self) -> u32 {
		self.coordinator.pass().id
	}

	/// Requests a refresh unless the proposal is already finalized.
	pub fn refresh(&self) -> Option<RequestOutcome> {
		if self.is_finalized() {
			return None;
		}
		Some(self.coordinator.request())
	}

	/// Refreshes even if the proposal was finalized.
	pub fn reload(&self) -> RequestOutcome {
		self.finalized.store(false, Ordering::Release);
		self.coordinator.request()
	}

	pub fn is_finalized(&self) -> bool {
		self.finalized.load(Ordering::Acquire)
	}

	pub fn is_latest(&self) -> bool {
		self.coordinator.pass().latest.load(Ordering::Acquire)
	}

	/// Pending deadline the card will refresh at.
	pub fn deadline_ms(&self) -> Option<u64> {
		self.coordinator.pass().timer.deadline_ms()
	}

	pub fn stats(&self) -> RefreshStats {
		self.coordinator.stats()
	}

	pub async fn wait_idle(&self) {
		self.coordinator.wait_idle().await;
	}
}

impl fmt::Debug for ProposalCard {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProposalCard")
			.field("id", &self.id())
			.field("finalized", &self.is_finalized())
			.field("coordinator", &self.coordinator)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::types::ProposalInfo;

	fn config() -> CourtConfig {
		CourtConfig {
			admin: "sei1admin".into(),
			allow_new_proposals: true,
			minimum_vote_proposal_percent: 1,
			minimum_vote_turnout_percent: 20,
			minimum_vote_pass_percent: 50,
			max_proposal_expiry_time_seconds: 86_400,
			execution_expiry_time_seconds: 3_600,
			last_config_change_timestamp_ms: 0,
		}
	}

	fn proposal(status: ProposalStatus, expiry_timestamp_ms: u64) -> Proposal {
		Proposal {
			status,
			info: ProposalInfo {
				proposer: "sei1proposer".into(),
				votes_for: Amount::ZERO,
				votes_against: Amount::ZERO,
				expiry_timestamp_ms,
			},
			messages: Vec::new(),
		}
	}

	#[test]
	fn vote_split_has_two_decimals() {
		assert_eq!(vote_split(Amount(2), Amount(1)), ("66.66%".to_string(), "33.34%".to_string()));
		assert_eq!(vote_split(Amount(1), Amount(0)), ("100.00%".to_string(), "0.00%".to_string()));
		assert_eq!(vote_split(Amount(0), Amount(0)), ("0.00%".to_string(), "0.00%".to_string()));
	}

	#[test]
	fn headlines_count_down_to_the_right_deadline() {
		let now = 1_000_000;
		let pending = proposal(ProposalStatus::Pending, now + 90_000);
		assert_eq!(
			headline(&pending, &config(), now),
			(Tone::Neutral, "Voting period ends in 1m30s".to_string())
		);

		let passed = proposal(ProposalStatus::Passed, now);
		assert_eq!(
			headline(&passed, &config(), now),
			(Tone::Info, "Proposal passed but has not been executed yet. Expires in 1h".to_string())
		);

		let overdue = proposal(ProposalStatus::Pending, now - 5_000);
		assert_eq!(headline(&overdue, &config(), now).1, "Voting period ends in 0s");
	}

	#[test]
	fn terminal_headlines() {
		let cases = [
			(ProposalStatus::Cancelled, Tone::Danger),
			(ProposalStatus::Executed, Tone::Success),
			(ProposalStatus::ExecutionExpired, Tone::Warning),
			(ProposalStatus::Rejected, Tone::Danger),
		];
		for (status, tone) in cases {
			assert_eq!(headline(&proposal(status, 0), &config(), 1).0, tone, "{status}");
		}
	}

	#[test]
	fn user_vote_lines() {
		assert_eq!(UserVote::NotVoted.to_string(), "You didn't vote on this");
		assert_eq!(
			UserVote::For(Amount(12)).to_string(),
			"You voted for this proposal with 12 shares."
		);
		assert_eq!(
			UserVote::Against(Amount(3)).to_string(),
			"You voted against this proposal with 3 shares."
		);
	}
}
