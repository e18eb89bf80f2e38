//! Error types for contract queries and view passes.

use thiserror::Error;

use crate::types::Amount;

/// Failure reported by a [`CourtClient`](crate::CourtClient) query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
	/// The node could not be reached or timed out.
	#[error("transport error: {0}")]
	Transport(String),

	/// The contract rejected the query.
	#[error("contract error: {0}")]
	Contract(String),
}

/// Errors surfaced by views.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
	#[error(transparent)]
	Query(#[from] QueryError),

	/// The connected account cannot create proposals yet.
	#[error("{required} staked votes are required to create a proposal, you have {staked}")]
	NotEnoughStakedVotes { required: Amount, staked: Amount },
}
