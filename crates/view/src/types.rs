//! Contract query response shapes.
//!
//! Field names mirror the contract's JSON. 128-bit amounts travel as decimal
//! strings and are wrapped in [`Amount`].

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Token amount encoded on the wire as a decimal string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(pub u128);

impl Amount {
	pub const ZERO: Self = Self(0);

	pub const fn get(self) -> u128 {
		self.0
	}

	/// `self * percent / 100` rounded down, the way the contract derives vote
	/// thresholds. Exact over the whole `u128` range for percentages up to 100.
	pub fn percent(self, percent: u8) -> Self {
		let percent = u128::from(percent);
		let whole = (self.0 / 100).saturating_mul(percent);
		Self(whole.saturating_add(self.0 % 100 * percent / 100))
	}
}

impl From<u128> for Amount {
	fn from(value: u128) -> Self {
		Self(value)
	}
}

impl fmt::Display for Amount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl Serialize for Amount {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for Amount {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		raw.parse::<u128>()
			.map(Self)
			.map_err(|err| de::Error::custom(format!("invalid amount {raw:?}: {err}")))
	}
}

/// Contract configuration as returned by the `config` query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtConfig {
	pub admin: String,
	pub allow_new_proposals: bool,
	pub minimum_vote_proposal_percent: u8,
	pub minimum_vote_turnout_percent: u8,
	pub minimum_vote_pass_percent: u8,
	pub max_proposal_expiry_time_seconds: u32,
	pub execution_expiry_time_seconds: u32,
	pub last_config_change_timestamp_ms: u64,
}

/// Denominations managed by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtDenom {
	pub votes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalSupply {
	pub votes: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
	pub staked_votes: Amount,
}

/// A user's vote on one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVoteInfo {
	pub active_votes: Amount,
	pub voted_for: bool,
}

/// Proposal lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
	/// Votes are still being collected.
	Pending,
	Rejected,
	/// Passed, waiting for execution.
	Passed,
	Cancelled,
	Executed,
	/// Passed but the execution window closed.
	ExecutionExpired,
}

impl ProposalStatus {
	/// True once nothing about the proposal can change any more.
	pub const fn is_finalized(self) -> bool {
		matches!(self, Self::Executed | Self::Cancelled)
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Rejected => "rejected",
			Self::Passed => "passed",
			Self::Cancelled => "cancelled",
			Self::Executed => "executed",
			Self::ExecutionExpired => "execution_expired",
		}
	}
}

impl fmt::Display for ProposalStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
	pub amount: Amount,
	pub denom: String,
}

/// One message a proposal would execute.
///
/// Kinds the views know how to describe get their own variant; anything else
/// is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalMessage {
	SendCoin {
		amount: Amount,
		denom: String,
		to: String,
	},
	TokenfactoryMint {
		tokens: Coin,
	},
	ExecuteWasmContract {
		contract: String,
		funds: Vec<Coin>,
		/// Base64-encoded execute message.
		msg: String,
	},
	UpgradeWasmContract {
		contract: String,
		new_code_id: u64,
		/// Base64-encoded migrate message.
		msg: String,
	},
	ChangeWasmContractAdmin {
		contract: String,
		new_admin: String,
	},
	ClearWasmContractAdmin {
		contract: String,
	},
	#[serde(untagged)]
	Other(serde_json::Value),
}

impl ProposalMessage {
	/// One-line human description.
	pub fn describe(&self) -> String {
		match self {
			Self::SendCoin { amount, denom, to } => format!("Send {amount} {denom} to {to}"),
			Self::TokenfactoryMint { tokens } => format!("Mint {} {}", tokens.amount, tokens.denom),
			Self::ExecuteWasmContract { contract, funds, msg } => {
				let funds = funds.iter().map(|c| format!("{} {}", c.amount, c.denom)).collect::<Vec<_>>().join(",");
				format!("Execute {contract} with funds [{funds}]: {}", decode_payload(msg))
			}
			Self::UpgradeWasmContract { contract, new_code_id, msg } => {
				format!("Upgrade {contract} to code {new_code_id}: {}", decode_payload(msg))
			}
			Self::ChangeWasmContractAdmin { contract, new_admin } => format!("Change admin of {contract} to {new_admin}"),
			Self::ClearWasmContractAdmin { contract } => format!("Clear admin of {contract}"),
			Self::Other(raw) => raw.to_string(),
		}
	}
}

/// Decodes a base64 contract message for display.
///
/// UTF-8 JSON is pretty-printed, other UTF-8 is shown as-is, and anything
/// that is not valid base64 or UTF-8 is returned unchanged.
pub fn decode_payload(msg: &str) -> String {
	let Ok(bytes) = BASE64.decode(msg) else {
		return msg.to_string();
	};
	let Ok(text) = String::from_utf8(bytes) else {
		return msg.to_string();
	};
	match serde_json::from_str::<serde_json::Value>(&text) {
		Ok(json) => serde_json::to_string_pretty(&json).unwrap_or(text),
		Err(_) => text,
	}
}

/// Proposal body as stored by the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalInfo {
	pub proposer: String,
	pub votes_for: Amount,
	pub votes_against: Amount,
	pub expiry_timestamp_ms: u64,
}

/// Response of the proposal query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
	pub status: ProposalStatus,
	pub info: ProposalInfo,
	pub messages: Vec<ProposalMessage>,
}

impl Proposal {
	/// Next moment the status is expected to change on its own.
	///
	/// Pending proposals change when voting ends; passed proposals when the
	/// execution window closes.
	pub fn deadline_ms(&self, config: &CourtConfig) -> Option<u64> {
		match self.status {
			ProposalStatus::Pending => Some(self.info.expiry_timestamp_ms),
			ProposalStatus::Passed => Some(
				self.info
					.expiry_timestamp_ms
					.saturating_add(u64::from(config.execution_expiry_time_seconds) * 1000),
			),
			_ => None,
		}
	}
}
