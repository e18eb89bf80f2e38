//! In-memory court contract.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use court_refresh::unix_now_ms;
use parking_lot::Mutex;

use crate::client::CourtClient;
use crate::error::QueryError;
use crate::types::{
	Amount, Coin, CourtConfig, CourtDenom, Proposal, ProposalInfo, ProposalMessage, ProposalStatus, TotalSupply,
	UserStats, UserVoteInfo,
};

/// Query names accepted by [`MemoryCourt::fail_next`] and
/// [`MemoryCourt::query_count`].
pub mod query {
	pub const CONFIG: &str = "config";
	pub const DENOM: &str = "denom";
	pub const TOTAL_SUPPLY: &str = "total_supply";
	pub const PROPOSAL_AMOUNT: &str = "proposal_amount";
	pub const PROPOSAL: &str = "proposal";
	pub const USER_STATS: &str = "user_stats";
	pub const USER_VOTE: &str = "user_vote";
	pub const BALANCE: &str = "balance";
}

/// Contract and chain state served by a [`MemoryCourt`].
#[derive(Debug, Clone)]
pub struct CourtState {
	pub chain_id: String,
	pub contract: String,
	pub account: Option<String>,
	pub config: CourtConfig,
	pub denom: String,
	pub total_supply: Amount,
	/// Indexed by proposal id.
	pub proposals: Vec<Proposal>,
	pub stakes: HashMap<String, Amount>,
	/// Bank balances keyed by `(account, denom)`.
	pub balances: HashMap<(String, String), Amount>,
	/// Votes keyed by `(proposal id, account)`.
	pub votes: HashMap<(u32, String), UserVoteInfo>,
}

/// [`CourtClient`] backed by a mutable [`CourtState`].
///
/// Supports per-query latency and one-shot injected failures, and counts
/// every query it serves.
#[derive(Debug)]
pub struct MemoryCourt {
	state: Mutex<CourtState>,
	latency: Mutex<Duration>,
	failures: Mutex<HashMap<&'static str, VecDeque<QueryError>>>,
	counts: Mutex<HashMap<&'static str, usize>>,
}

impl MemoryCourt {
	pub fn new(state: CourtState) -> Self {
		Self {
			state: Mutex::new(state),
			latency: Mutex::new(Duration::ZERO),
			failures: Mutex::new(HashMap::new()),
			counts: Mutex::new(HashMap::new()),
		}
	}

	/// A small court with one proposal in each interesting state and a
	/// connected account `sei1alice`.
	pub fn demo() -> Self {
		Self::new(CourtState::demo(unix_now_ms()))
	}

	/// Applies `f` to the state. Later queries see the change.
	pub fn update<R>(&self, f: impl FnOnce(&mut CourtState) -> R) -> R {
		f(&mut self.state.lock())
	}

	pub fn snapshot(&self) -> CourtState {
		self.state.lock().clone()
	}

	/// Delay applied to every query.
	pub fn set_latency(&self, latency: Duration) {
		*self.latency.lock() = latency;
	}

	/// Makes the next call to `query` fail with `error`. Calls queue up.
	pub fn fail_next(&self, query: &'static str, error: QueryError) {
		self.failures.lock().entry(query).or_default().push_back(error);
	}

	/// How many times `query` was called, failed calls included.
	pub fn query_count(&self, query: &str) -> usize {
		self.counts.lock().get(query).copied().unwrap_or(0)
	}

	async fn enter(&self, query: &'static str) -> Result<(), QueryError> {
		*self.counts.lock().entry(query).or_default() += 1;
		let latency = *self.latency.lock();
		if !latency.is_zero() {
			tokio::time::sleep(latency).await;
		}
		let injected = self.failures.lock().get_mut(query).and_then(VecDeque::pop_front);
		match injected {
			Some(error) => {
				tracing::trace!(query, %error, "memory_court.injected_failure");
				Err(error)
			}
			None => Ok(()),
		}
	}
}

#[async_trait]
impl CourtClient for MemoryCourt {
	fn chain_id(&self) -> String {
		self.state.lock().chain_id.clone()
	}

	fn contract_address(&self) -> String {
		self.state.lock().contract.clone()
	}

	fn account(&self) -> Option<String> {
		self.state.lock().account.clone()
	}

	async fn query_config(&self) -> Result<CourtConfig, QueryError> {
		self.enter(query::CONFIG).await?;
		Ok(self.state.lock().config.clone())
	}

	async fn query_denom(&self) -> Result<CourtDenom, QueryError> {
		self.enter(query::DENOM).await?;
		Ok(CourtDenom {
			votes: self.state.lock().denom.clone(),
		})
	}

	async fn query_total_supply(&self) -> Result<TotalSupply, QueryError> {
		self.enter(query::TOTAL_SUPPLY).await?;
		Ok(TotalSupply {
			votes: self.state.lock().total_supply,
		})
	}

	async fn query_proposal_amount(&self) -> Result<u32, QueryError> {
		self.enter(query::PROPOSAL_AMOUNT).await?;
		let len = self.state.lock().proposals.len();
		u32::try_from(len).map_err(|_| QueryError::Contract(format!("proposal count {len} out of range")))
	}

	async fn query_proposal(&self, id: u32) -> Result<Option<Proposal>, QueryError> {
		self.enter(query::PROPOSAL).await?;
		Ok(self.state.lock().proposals.get(id as usize).cloned())
	}

	async fn query_user_stats(&self, user: &str) -> Result<UserStats, QueryError> {
		self.enter(query::USER_STATS).await?;
		Ok(UserStats {
			staked_votes: self.state.lock().stakes.get(user).copied().unwrap_or_default(),
		})
	}

	async fn query_user_vote(&self, id: u32, user: &str) -> Result<UserVoteInfo, QueryError> {
		self.enter(query::USER_VOTE).await?;
		let vote = self.state.lock().votes.get(&(id, user.to_string())).copied();
		Ok(vote.unwrap_or(UserVoteInfo {
			active_votes: Amount::ZERO,
			voted_for: false,
		}))
	}

	async fn query_balance(&self, user: &str, denom: &str) -> Result<Amount, QueryError> {
		self.enter(query::BALANCE).await?;
		let state = self.state.lock();
		Ok(state
			.balances
			.get(&(user.to_string(), denom.to_string()))
			.copied()
			.unwrap_or_default())
	}
}

impl CourtState {
	/// Empty court on `atlantic-2` with no account connected.
	pub fn empty() -> Self {
		Self {
			chain_id: "atlantic-2".to_string(),
			contract: "sei1court".to_string(),
			account: None,
			config: CourtConfig {
				admin: "sei1court".to_string(),
				allow_new_proposals: true,
				minimum_vote_proposal_percent: 1,
				minimum_vote_turnout_percent: 20,
				minimum_vote_pass_percent: 50,
				max_proposal_expiry_time_seconds: 7 * 86_400,
				execution_expiry_time_seconds: 86_400,
				last_config_change_timestamp_ms: 0,
			},
			denom: "factory/sei1court/votes".to_string(),
			total_supply: Amount::ZERO,
			proposals: Vec::new(),
			stakes: HashMap::new(),
			balances: HashMap::new(),
			votes: HashMap::new(),
		}
	}

	/// Demo court relative to `now_ms`: one executed, one pending and one
	/// passed proposal.
	pub fn demo(now_ms: u64) -> Self {
		let mut state = Self::empty();
		state.account = Some("sei1alice".to_string());
		state.config.last_config_change_timestamp_ms = now_ms.saturating_sub(86_400_000);
		state.total_supply = Amount(1_000_000);
		state.stakes.insert("sei1alice".to_string(), Amount(25_000));
		state
			.balances
			.insert(("sei1alice".to_string(), state.denom.clone()), Amount(5_000));
		state.votes.insert(
			(1, "sei1alice".to_string()),
			UserVoteInfo {
				active_votes: Amount(25_000),
				voted_for: true,
			},
		);

		let proposal = |status, votes_for, votes_against, expiry_timestamp_ms, messages| Proposal {
			status,
			info: ProposalInfo {
				proposer: "sei1alice".to_string(),
				votes_for: Amount(votes_for),
				votes_against: Amount(votes_against),
				expiry_timestamp_ms,
			},
			messages,
		};
		state.proposals = vec![
			proposal(
				ProposalStatus::Executed,
				400_000,
				20_000,
				now_ms.saturating_sub(3 * 86_400_000),
				vec![ProposalMessage::SendCoin {
					amount: Amount(1_000),
					denom: "usei".to_string(),
					to: "sei1bob".to_string(),
				}],
			),
			proposal(
				ProposalStatus::Pending,
				25_000,
				10_000,
				now_ms + 90_000,
				vec![ProposalMessage::TokenfactoryMint {
					tokens: Coin {
						amount: Amount(50_000),
						denom: state.denom.clone(),
					},
				}],
			),
			proposal(
				ProposalStatus::Passed,
				300_000,
				0,
				now_ms.saturating_sub(60_000),
				vec![ProposalMessage::ChangeWasmContractAdmin {
					contract: "sei1vault".to_string(),
					new_admin: "sei1court".to_string(),
				}],
			),
		];
		state
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[tokio::test]
	async fn serves_state_and_counts_queries() {
		let court = MemoryCourt::demo();
		assert_eq!(court.query_proposal_amount().await.unwrap(), 3);
		assert_eq!(court.query_proposal(0).await.unwrap().unwrap().status, ProposalStatus::Executed);
		assert_eq!(court.query_proposal(9).await.unwrap(), None);
		assert_eq!(court.query_count(query::PROPOSAL), 2);

		let vote = court.query_user_vote(0, "sei1alice").await.unwrap();
		assert_eq!(vote.active_votes, Amount::ZERO);
		let vote = court.query_user_vote(1, "sei1alice").await.unwrap();
		assert!(vote.voted_for);
	}

	#[tokio::test]
	async fn injected_failures_are_one_shot() {
		let court = MemoryCourt::new(CourtState::empty());
		court.fail_next(query::CONFIG, QueryError::Transport("timeout".into()));

		assert_eq!(court.query_config().await, Err(QueryError::Transport("timeout".into())));
		assert!(court.query_config().await.is_ok());
		assert_eq!(court.query_count(query::CONFIG), 2);
	}

	#[tokio::test]
	async fn updates_are_visible_to_later_queries() {
		let court = MemoryCourt::new(CourtState::empty());
		court.update(|state| state.total_supply = Amount(77));
		assert_eq!(court.query_total_supply().await.unwrap().votes, Amount(77));
	}
}
