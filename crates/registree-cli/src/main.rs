//! RegisTree CLI
//!
//! Drives the change-tracking engine against a SQLite file. Undo history
//! lives for one invocation; the audit trail and the records persist.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod session;

#[derive(Debug, Parser)]
#[command(name = "registree")]
#[command(about = "RegisTree - audited, lock-aware school records", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = "registree.db")]
    db: PathBuf,

    /// TOML engine configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Actor recorded in the audit trail (overrides config and environment)
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or migrate the database and store the school week
    Init,
    /// Calendar events and their attendance sweep
    Calendar(commands::calendar::CalendarArgs),
    /// Date lock queries
    Lock(commands::lock::LockArgs),
    /// Record edits through the audited pipeline
    Record(commands::record::RecordArgs),
    /// Audit history of one record
    History(commands::history::HistoryArgs),
}

fn main() {
    let cli = Cli::parse();
    let options = session::SessionOptions {
        db: cli.db,
        config: cli.config,
        actor: cli.actor,
    };

    let result = match cli.command {
        Commands::Init => commands::init::execute(&options),
        Commands::Calendar(args) => commands::calendar::execute(&options, args),
        Commands::Lock(args) => commands::lock::execute(&options, args),
        Commands::Record(args) => commands::record::execute(&options, args),
        Commands::History(args) => commands::history::execute(&options, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
