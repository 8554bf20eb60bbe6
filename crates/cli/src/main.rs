use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;

use icn_config::AssemblyConfig;
use icn_core::{FileStorage, Storage};
use icn_governance::{
    AccessRegistry, AssemblyManager, Identity, ProposalAction, ProposalRecord, StatuteHash,
    StoredAccessRegistry, StoredProposalRegistry, SystemClock,
};

#[derive(Parser)]
#[command(author, version, about = "Schedule General Assemblies and run delegate elections", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $ICN_ASSEMBLY_CONFIG or assembly.yaml, then ICN_* variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured data directory
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Identity the command is issued as
    #[arg(long = "as", global = true, value_name = "IDENTITY")]
    caller: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule a regular GA (delegate only)
    Schedule {
        /// Start time, seconds since the Unix epoch
        time: u64,
        /// Duration in seconds
        duration: u64,
    },
    /// Schedule the extraordinary GA requested by an approved proposal (gateway only)
    ScheduleExtraordinary { proposal_id: String },
    /// Reserve a proposal voting slot in a GA (gateway only)
    ReserveSlot { ga_index: usize },
    /// Reserve the delegate election slot of a GA (gateway only)
    ReserveElection { ga_index: usize },
    /// Register a delegate candidate (gateway only)
    Register { candidate: String },
    /// Cast one vote for a candidate (gateway only)
    Vote { candidate: String },
    /// Conclude the delegate election (operator only)
    Conclude {
        min_participants: u64,
        min_yes_votes: u64,
    },
    /// Make the next GA current if it has begun
    Advance {
        /// Keep stepping until no further GA has begun
        #[arg(long)]
        all: bool,
    },
    /// Adopt the statute of an approved statute proposal (operator only)
    UpdateStatute { proposal_id: String },
    /// Show the window of a GA
    Window { index: usize },
    /// Show the overall assembly state
    Status,
    /// Check whether a GA could be scheduled at a time
    CanSchedule {
        time: u64,
        #[arg(long)]
        extraordinary: bool,
    },
    /// Manage the stored delegate
    Delegate {
        #[command(subcommand)]
        command: DelegateCommands,
    },
    /// Manage stored proposal outcomes
    Proposal {
        #[command(subcommand)]
        command: ProposalCommands,
    },
}

#[derive(Subcommand)]
enum DelegateCommands {
    /// Set the delegate directly (bootstrap)
    Set { identity: String },
    /// Show the current delegate
    Show,
}

#[derive(Subcommand)]
enum ProposalCommands {
    /// Record the outcome of a proposal
    Add {
        id: String,
        #[arg(value_enum)]
        action: ActionArg,
        /// Mark the proposal as approved
        #[arg(long)]
        approved: bool,
        /// Proposed date, seconds since the Unix epoch
        #[arg(long, default_value_t = 0)]
        proposed_date: u64,
        /// Statute text file to hash
        #[arg(long, conflicts_with = "statute_hash")]
        statute_file: Option<PathBuf>,
        /// Statute hash, 64 hex characters
        #[arg(long)]
        statute_hash: Option<String>,
    },
    /// List recorded proposals
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    ExtraordinaryGa,
    Statute,
    Other,
}

impl From<ActionArg> for ProposalAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::ExtraordinaryGa => ProposalAction::ExtraordinaryGa,
            ActionArg::Statute => ProposalAction::Statute,
            ActionArg::Other => ProposalAction::Other,
        }
    }
}

impl Cli {
    fn caller(&self) -> Result<Identity> {
        self.caller
            .as_deref()
            .map(Identity::from)
            .context("this command needs --as <IDENTITY>")
    }

    fn load_config(&self) -> Result<AssemblyConfig> {
        let mut config = match &self.config {
            Some(path) => AssemblyConfig::from_file(path)?,
            None => AssemblyConfig::load()?,
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        Ok(config)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn statute_from_args(
    statute_file: &Option<PathBuf>,
    statute_hash: &Option<String>,
) -> Result<Option<StatuteHash>> {
    if let Some(path) = statute_file {
        let text = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        return Ok(Some(StatuteHash::digest(text)));
    }
    statute_hash
        .as_deref()
        .map(StatuteHash::from_hex)
        .transpose()
        .context("statute hash must be 64 hex characters")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    icn_core::init_tracing(&config.log_level)
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))?;

    let storage: Arc<dyn Storage> = Arc::new(
        FileStorage::new(&config.data_dir)
            .await
            .with_context(|| format!("opening data directory {}", config.data_dir))?,
    );
    debug!("Using data directory {}", config.data_dir);
    let access = Arc::new(StoredAccessRegistry::new(storage.clone()));
    let proposals = Arc::new(StoredProposalRegistry::new(storage.clone()));

    let mut manager = AssemblyManager::new(
        &config,
        storage.clone(),
        access.clone(),
        proposals.clone(),
        Arc::new(SystemClock),
    )
    .await?;

    match &cli.command {
        Commands::Schedule { time, duration } => {
            let index = manager
                .schedule_regular_ga(&cli.caller()?, *time, *duration)
                .await?;
            print_json(&manager.ga_window(index)?)?;
        }
        Commands::ScheduleExtraordinary { proposal_id } => {
            let index = manager
                .schedule_extraordinary_ga(&cli.caller()?, proposal_id)
                .await?;
            print_json(&manager.ga_window(index)?)?;
        }
        Commands::ReserveSlot { ga_index } => {
            let start = manager.reserve_proposal_slot(&cli.caller()?, *ga_index).await?;
            print_json(&serde_json::json!({ "ga_index": ga_index, "slot_start": start }))?;
        }
        Commands::ReserveElection { ga_index } => {
            let start = manager
                .reserve_delegate_election_slot(&cli.caller()?, *ga_index)
                .await?;
            print_json(&serde_json::json!({ "ga_index": ga_index, "election_start": start }))?;
        }
        Commands::Register { candidate } => {
            let position = manager
                .register_candidate(&cli.caller()?, Identity::from(candidate.as_str()))
                .await?;
            print_json(&serde_json::json!({ "candidate": candidate, "position": position }))?;
        }
        Commands::Vote { candidate } => {
            let votes = manager
                .cast_delegate_vote(&cli.caller()?, &Identity::from(candidate.as_str()))
                .await?;
            print_json(&serde_json::json!({ "candidate": candidate, "votes": votes }))?;
        }
        Commands::Conclude {
            min_participants,
            min_yes_votes,
        } => {
            let outcome = manager
                .conclude_delegate_voting(&cli.caller()?, *min_participants, *min_yes_votes)
                .await?;
            print_json(&outcome)?;
            outcome.into_result()?;
        }
        Commands::Advance { all } => {
            let mut steps = 0;
            while manager.advance_if_elapsed().await? {
                steps += 1;
                if !all {
                    break;
                }
            }
            print_json(&serde_json::json!({
                "advanced": steps,
                "current_ga": manager.current_ga_index(),
            }))?;
        }
        Commands::UpdateStatute { proposal_id } => {
            let statute = manager.update_statute(&cli.caller()?, proposal_id).await?;
            print_json(&serde_json::json!({ "statute": statute }))?;
        }
        Commands::Window { index } => {
            print_json(&manager.ga_window(*index)?)?;
        }
        Commands::Status => {
            let current = manager
                .current_ga_index()
                .map(|index| manager.ga_window(index))
                .transpose()?;
            print_json(&serde_json::json!({
                "total_scheduled": manager.total_scheduled(),
                "current_ga": current,
                "during_current_ga": manager.is_during_current_ga(),
                "can_vote_for_delegate": manager.can_vote_for_delegate_now(),
                "statute": manager.current_statute(),
                "candidates": manager.candidates(),
                "delegate": access.delegate().await?,
            }))?;
        }
        Commands::CanSchedule { time, extraordinary } => {
            print_json(&serde_json::json!({
                "time": time,
                "extraordinary": extraordinary,
                "allowed": manager.can_schedule_at(*time, *extraordinary),
            }))?;
        }
        Commands::Delegate { command } => match command {
            DelegateCommands::Set { identity } => {
                access.set_delegate(&Identity::from(identity.as_str())).await?;
                print_json(&serde_json::json!({ "delegate": identity }))?;
            }
            DelegateCommands::Show => {
                print_json(&serde_json::json!({ "delegate": access.delegate().await? }))?;
            }
        },
        Commands::Proposal { command } => match command {
            ProposalCommands::Add {
                id,
                action,
                approved,
                proposed_date,
                statute_file,
                statute_hash,
            } => {
                let record = ProposalRecord {
                    id: id.clone(),
                    approved: *approved,
                    action: (*action).into(),
                    proposed_date: *proposed_date,
                    statute: statute_from_args(statute_file, statute_hash).await?,
                };
                proposals.insert(&record).await?;
                print_json(&record)?;
            }
            ProposalCommands::List => {
                print_json(&proposals.list().await?)?;
            }
        },
    }

    Ok(())
}
