//! Runtime configuration for refresh behavior.
//!
//! ```toml
//! log_filter = "court_view=debug,info"
//!
//! [visibility]
//! poll_base_ms = 1000
//! poll_jitter_ms = 2000
//! ```
//!
//! Every key is optional; missing keys take their defaults. Unknown keys
//! are rejected so typos surface instead of being ignored.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::visibility::VisibilityPolicy;

/// Top-level refresh configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshConfig {
	/// `tracing-subscriber` filter used when `RUST_LOG` is unset.
	pub log_filter: String,
	pub visibility: VisibilityConfig,
}

impl Default for RefreshConfig {
	fn default() -> Self {
		Self {
			log_filter: "info".to_string(),
			visibility: VisibilityConfig::default(),
		}
	}
}

/// Poll cadence for passes gated on visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisibilityConfig {
	pub poll_base_ms: u64,
	pub poll_jitter_ms: u64,
}

impl Default for VisibilityConfig {
	fn default() -> Self {
		Self {
			poll_base_ms: 1000,
			poll_jitter_ms: 2000,
		}
	}
}

impl VisibilityConfig {
	pub fn policy(&self) -> VisibilityPolicy {
		VisibilityPolicy {
			base: Duration::from_millis(self.poll_base_ms),
			jitter: Duration::from_millis(self.poll_jitter_ms),
		}
	}
}

impl RefreshConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let config = Self::from_toml_str(&source)?;
		tracing::debug!(path = %path.display(), "refresh.config.loaded");
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.visibility.poll_base_ms == 0 {
			return Err(ConfigError::Invalid {
				key: "visibility.poll_base_ms",
				reason: "must be greater than zero".to_string(),
			});
		}
		if self.log_filter.trim().is_empty() {
			return Err(ConfigError::Invalid {
				key: "log_filter",
				reason: "must not be empty".to_string(),
			});
		}
		Ok(())
	}
}
