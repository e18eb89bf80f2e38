use async_trait::async_trait;

use crate::error::QueryError;
use crate::types::{Amount, CourtConfig, CourtDenom, Proposal, TotalSupply, UserStats, UserVoteInfo};

/// Read access to one court contract on one network.
///
/// Views hold a client behind `Arc<dyn CourtClient>` and call it from
/// refresh passes. Implementations must be cheap to call concurrently.
#[async_trait]
pub trait CourtClient: Send + Sync + 'static {
	/// Chain the client is currently pointed at.
	fn chain_id(&self) -> String;

	fn contract_address(&self) -> String;

	/// Connected account, if any.
	fn account(&self) -> Option<String>;

	async fn query_config(&self) -> Result<CourtConfig, QueryError>;

	async fn query_denom(&self) -> Result<CourtDenom, QueryError>;

	async fn query_total_supply(&self) -> Result<TotalSupply, QueryError>;

	/// Number of proposals ever created. Ids run from `0` to `amount - 1`.
	async fn query_proposal_amount(&self) -> Result<u32, QueryError>;

	/// Returns `None` when the contract has no proposal with `id`.
	async fn query_proposal(&self, id: u32) -> Result<Option<Proposal>, QueryError>;

	async fn query_user_stats(&self, user: &str) -> Result<UserStats, QueryError>;

	/// `active_votes` is zero when `user` did not vote on proposal `id`.
	async fn query_user_vote(&self, id: u32, user: &str) -> Result<UserVoteInfo, QueryError>;

	/// Bank balance of `user` in `denom`.
	async fn query_balance(&self, user: &str, denom: &str) -> Result<Amount, QueryError>;
}
