//! Refresh coordination primitives for court coordinator views.
//!
//! The centerpiece is [`RefreshCoordinator`], which runs one owner's
//! fetch-and-render pass at a time and folds any requests that arrive
//! mid-flight into a single follow-up pass. The rest of the crate supplies
//! what owners typically wire around it: an [`EventBus`] for fan-out
//! triggers, a visibility gate, a [`DeadlineTimer`], and time formatting.

/// Task classification used when spawning.
mod class;
/// Runtime configuration loaded from TOML.
pub mod config;
/// Per-pass context handed to refresh callbacks.
mod context;
/// The coalescing refresh coordinator.
pub mod coordinator;
/// Error types.
pub mod error;
/// Publish/subscribe fan-out with scoped subscriptions.
pub mod events;
/// Join error classification.
mod panic;
/// Task spawning on the ambient or global runtime.
mod spawn;
/// Compact human-readable durations.
pub mod time_format;
/// One-shot deadline timers with re-arming.
pub mod timer;
/// Readiness gating for passes that should only run while visible.
pub mod visibility;

pub use class::TaskClass;
pub use config::{RefreshConfig, VisibilityConfig};
pub use context::PassContext;
pub use coordinator::{PassFailure, RefreshCoordinator, RefreshHandle, RefreshPass, RefreshStats, RequestOutcome};
pub use error::{ConfigError, TimeParseError};
pub use events::{EventBus, Subscription};
pub use spawn::spawn;
pub use time_format::{humanize_ms, parse_time_amount};
pub use timer::{CallbackId, DeadlineTimer, unix_now_ms};
pub use visibility::{Readiness, Visibility, VisibilityFlag, VisibilityPolicy, wait_until_visible};
