//! kanban-sync: reconcile an Obsidian kanban board with Jira issues.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kanban_sync::{
    run_sync, run_tidy, Config, FileStorage, IssueTracker, JiraClient, SyncOptions, SyncOutcome,
    SyncSummary,
};

#[derive(Parser, Debug)]
#[command(name = "kanban-sync")]
#[command(about = "Keep an Obsidian kanban board in sync with Jira")]
struct Args {
    /// Path to the vault directory (defaults to $OBSIDIAN_VAULT_PATH)
    #[arg(short, long, global = true)]
    vault: Option<String>,

    /// Path to the config file (defaults to <config dir>/kanban-sync/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch issues and reconcile the board
    Sync {
        /// Print the resulting board instead of writing it
        #[arg(long)]
        dry_run: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fix spacing and check off done columns without contacting Jira
    Tidy {
        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        json: bool,
    },
}

fn build_trackers(config: &Config) -> Vec<Box<dyn IssueTracker>> {
    let mut trackers: Vec<Box<dyn IssueTracker>> = Vec::new();
    for account in &config.board.accounts {
        match JiraClient::from_account(account) {
            Ok(client) => trackers.push(Box::new(client)),
            Err(e) => warn!("Skipping account {}: {}", account.alias, e),
        }
    }
    trackers
}

fn print_summary(summary: &SyncSummary) {
    let report = &summary.report;
    for added in &report.added {
        println!("added    {} -> {}", added.key, added.section);
    }
    for moved in &report.moved {
        let from = moved.from.as_deref().unwrap_or("(top of note)");
        println!("moved    {} {} -> {}", moved.key, from, moved.to);
    }
    for key in &report.duplicates_removed {
        println!("removed  duplicate {}", key);
    }
    for section in &report.sections_created {
        println!("created  section {}", section);
    }
    if report.completed > 0 {
        println!("checked  {} item(s)", report.completed);
    }
    if report.rejected > 0 {
        println!("rejected {} malformed record(s)", report.rejected);
    }
    if let Some(notes) = &summary.notes {
        for uri in &notes.created {
            println!("note     {}", uri);
        }
    }
}

fn print_outcome(outcome: &SyncOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    match outcome {
        SyncOutcome::Bootstrapped { written: true } => {
            println!("Enabled autoUpdateKanban; run again to reconcile the board")
        }
        SyncOutcome::Bootstrapped { written: false } => {
            println!("Would enable autoUpdateKanban on the board")
        }
        SyncOutcome::Disabled => println!("Board has autoUpdateKanban: false; nothing done"),
        SyncOutcome::Unchanged(summary) => {
            print_summary(summary);
            println!("Board is up to date");
        }
        SyncOutcome::Updated { summary, .. } => {
            print_summary(summary);
            println!("Board updated");
        }
        SyncOutcome::Preview { summary, text } => {
            print_summary(summary);
            println!("--- board (dry run) ---");
            print!("{}", text);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug,kanban_sync=debug,kanban_core=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(args.vault.as_deref(), args.config.as_deref())
        .context("Failed to load configuration")?;
    info!("Vault path: {:?}", config.vault_path);
    info!("Board: {}", config.board.board);

    let storage = FileStorage::new(config.vault_path.clone());

    let (outcome, json) = match args.command {
        Command::Sync { dry_run, json } => {
            let trackers = build_trackers(&config);
            if trackers.is_empty() {
                warn!("No usable accounts configured; reconciling with no issues");
            }
            let options = SyncOptions::new(dry_run);
            let outcome = run_sync(&storage, &trackers, &config.board, &options)
                .await
                .context("Sync failed")?;
            (outcome, json)
        }
        Command::Tidy { dry_run, json } => {
            let outcome = run_tidy(&storage, &config.board, dry_run)
                .await
                .context("Tidy failed")?;
            (outcome, json)
        }
    };

    print_outcome(&outcome, json)
}
