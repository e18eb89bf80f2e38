//! Error types for configuration loading and time parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading [`RefreshConfig`](crate::RefreshConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The TOML document could not be parsed or had unknown keys.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A value parsed but is out of range.
	#[error("invalid value for '{key}': {reason}")]
	Invalid {
		/// Dotted key of the offending option.
		key: &'static str,
		reason: String,
	},
}

/// Errors from [`parse_time_amount`](crate::parse_time_amount).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
	#[error("malformed time amount: {0:?}")]
	Malformed(String),

	#[error("time amount out of range: {0:?}")]
	Overflow(String),
}
