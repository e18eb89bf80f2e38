//! Court watch.
//!
//! Runs the court views against an in-memory contract and prints every frame
//! they paint. The proposal list pages its cards in while a short script
//! stakes votes, creates a proposal, hides and shows the cards, and finally
//! disconnects the wallet.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use court_refresh::{RefreshConfig, VisibilityFlag, parse_time_amount, unix_now_ms};
use court_view::{
	Amount, ConfigPanel, ConfigView, CourtBus, CourtClient, CourtEvent, MemoryCourt, PagerOptions, Proposal,
	ProposalInfo, ProposalList, ProposalListView, ProposalMessage, ProposalStatus, ProposalView, StakingBalances,
	StakingView, Surface, ViewState, court_bus,
};
use tracing::info;

/// Court watch command line arguments.
#[derive(Parser, Debug)]
#[command(name = "court-watch")]
#[command(about = "Keep court coordinator views refreshed against an in-memory contract")]
struct Args {
	/// Refresh configuration (TOML)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// How long to run, e.g. `5s` or `1m30s`
	#[arg(long, value_name = "TIME", default_value = "5s")]
	run_for: String,

	/// Simulated latency of every contract query, in milliseconds
	#[arg(long, value_name = "MS", default_value_t = 150)]
	latency_ms: u64,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let config = match &args.config {
		Some(path) => RefreshConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => RefreshConfig::default(),
	};
	setup_tracing(args.verbose, &config.log_filter);

	let run_for = parse_time_amount(&args.run_for).context("invalid --run-for")?;
	let run_for = Duration::from_millis(u64::try_from(run_for).context("--run-for must not be negative")?);
	info!(run_for = %args.run_for, latency_ms = args.latency_ms, "court-watch.start");

	let court = Arc::new(MemoryCourt::demo());
	court.set_latency(Duration::from_millis(args.latency_ms));
	let client: Arc<dyn CourtClient> = court.clone();
	let bus = court_bus();
	let visible = VisibilityFlag::new(true);
	let policy = config.visibility.policy();

	let _config_panel = ConfigPanel::new(client.clone(), print_surface("config", render_config), &bus);
	let _staking = StakingBalances::new(client.clone(), print_surface("staking", render_staking), &bus);
	let options = PagerOptions {
		placeholder: Arc::new(visible.clone()),
		policy,
		card_visibility: Arc::new(visible.clone()),
		..PagerOptions::new(Arc::new(|id: u32| print_surface(format!("proposal #{id}"), render_proposal)))
	};
	let list = Arc::new(ProposalList::with_pager(
		client.clone(),
		print_surface("proposals", render_list),
		&bus,
		options,
	));

	match list.check_eligibility().await {
		Ok(required) => info!(%required, "court-watch.eligible"),
		Err(err) => info!(error = %err, "court-watch.not_eligible"),
	}

	let script = tokio::spawn(script(Arc::clone(&court), bus.clone(), visible.clone(), Arc::clone(&list)));
	tokio::time::sleep(run_for).await;

	script.abort();
	info!(cards = list.card_ids().len(), "court-watch.done");
	Ok(())
}

/// Scripted user activity, one step at a time.
async fn script(court: Arc<MemoryCourt>, bus: CourtBus, visible: VisibilityFlag, list: Arc<ProposalList>) {
	let step = Duration::from_millis(700);
	let confirmed = |court: &MemoryCourt| CourtEvent::TransactionConfirmed {
		chain_id: court.chain_id(),
		sender: "sei1alice".to_string(),
	};

	tokio::time::sleep(step).await;
	info!("court-watch.script.stake");
	court.update(|state| {
		let denom = state.denom.clone();
		if let Some(staked) = state.stakes.get_mut("sei1alice") {
			staked.0 += 5_000;
		}
		if let Some(free) = state.balances.get_mut(&("sei1alice".to_string(), denom)) {
			free.0 = free.0.saturating_sub(5_000);
		}
	});
	bus.emit(&confirmed(court.as_ref()));

	tokio::time::sleep(step).await;
	info!("court-watch.script.propose");
	court.update(|state| {
		state.proposals.push(Proposal {
			status: ProposalStatus::Pending,
			info: ProposalInfo {
				proposer: "sei1alice".to_string(),
				votes_for: Amount::ZERO,
				votes_against: Amount::ZERO,
				expiry_timestamp_ms: unix_now_ms() + 2_000,
			},
			messages: vec![ProposalMessage::ClearWasmContractAdmin {
				contract: "sei1vault".to_string(),
			}],
		});
	});
	bus.emit(&confirmed(court.as_ref()));

	tokio::time::sleep(step).await;
	info!("court-watch.script.hide");
	visible.set(false);
	court.update(|state| {
		if let Some(pending) = state.proposals.get_mut(1) {
			pending.info.votes_against.0 += 12_000;
		}
	});
	bus.emit(&confirmed(court.as_ref()));

	tokio::time::sleep(step).await;
	info!("court-watch.script.show");
	visible.set(true);
	list.load_older();

	tokio::time::sleep(step).await;
	info!("court-watch.script.disconnect");
	court.update(|state| state.account = None);
	bus.emit(&CourtEvent::DefaultProviderChanged);
}

fn print_surface<T: Send + 'static>(label: impl Into<String>, render: fn(&T) -> String) -> Arc<dyn Surface<T>> {
	let label = label.into();
	Arc::new(move |state: ViewState<T>| {
		let line = match &state {
			ViewState::Loading => "loading...".to_string(),
			ViewState::Ready(view) => render(view),
			ViewState::NotConnected => "[Not connected]".to_string(),
			ViewState::Failed(err) => format!("[Error] {err}"),
		};
		println!("{label:>12} | {line}");
	})
}

fn render_config(view: &ConfigView) -> String {
	let admin = view.admin.as_deref().unwrap_or("[None, one can be proposed]");
	format!(
		"supply {} {} | admin {}{} | new proposals {} (>= {} votes, {}%) | turnout {} ({}%) | pass {}% | voting {} | execution {}",
		view.total_supply,
		view.votes_denom,
		admin,
		if view.viewer_is_admin { " (you)" } else { "" },
		if view.allow_new_proposals { "allowed" } else { "disabled" },
		view.min_proposal_votes,
		view.min_proposal_percent,
		view.min_turnout_votes,
		view.min_turnout_percent,
		view.min_pass_percent,
		view.voting_time,
		view.execution_window,
	)
}

fn render_staking(view: &StakingView) -> String {
	format!("{}: staked {} | unstaked {} {}", view.account, view.staked, view.unstaked, view.denom)
}

fn render_list(view: &ProposalListView) -> String {
	if view.can_create {
		"new proposal: available".to_string()
	} else {
		"new proposal: connect a wallet".to_string()
	}
}

fn render_proposal(view: &ProposalView) -> String {
	format!(
		"[{:?}] {} | by {} | for {} ({}) against {} ({}) | {} | {}",
		view.tone,
		view.headline,
		view.proposer,
		view.votes_for,
		view.percent_for,
		view.votes_against,
		view.percent_against,
		view.user_vote,
		view.messages.join("; "),
	)
}

fn setup_tracing(verbose: bool, fallback: &str) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("court_refresh=trace,court_view=debug,court_watch=debug,info")
		} else {
			EnvFilter::new(fallback)
		}
	});
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
