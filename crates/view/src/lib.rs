//! Self-refreshing views over a court coordinator contract.
//!
//! Every view owns one [`RefreshCoordinator`](court_refresh::RefreshCoordinator)
//! and a [`Surface`] it paints into. Views subscribe to [`CourtEvent`]s on a
//! shared [`CourtBus`] when created and unsubscribe when dropped.

/// Read access to the contract.
mod client;
/// Contract configuration panel.
pub mod config_panel;
/// Error types.
pub mod error;
/// Court-wide events.
pub mod events;
/// In-memory contract for tests and demos.
pub mod memory;
/// Proposal cards.
pub mod proposal;
/// Proposal list header and card pager.
pub mod proposal_list;
/// Staking balances.
pub mod staking;
/// Render targets.
pub mod surface;
/// Contract query response shapes.
pub mod types;

pub use client::CourtClient;
pub use config_panel::{ConfigPanel, ConfigView};
pub use error::{QueryError, ViewError};
pub use events::{CourtBus, CourtEvent, court_bus};
pub use memory::{CourtState, MemoryCourt};
pub use proposal::{CardOptions, NewerProposal, ProposalCard, ProposalView, Tone, UserVote};
pub use proposal_list::{CardSurfaces, PagerOptions, ProposalList, ProposalListView};
pub use staking::{StakingBalances, StakingView};
pub use surface::{RecordingSurface, Surface, ViewState};
pub use types::{Amount, CourtConfig, Proposal, ProposalInfo, ProposalMessage, ProposalStatus};
