//! Calendar event commands
//!
//! Usage:
//!   registree calendar add --title T --start D [--end D] [--kind K]
//!   registree calendar list

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use registree_core::calendar_sync::calendar_from_records;
use registree_core::{ExError, LockKind, LockRule};

use crate::session::{self, CliResult, SessionOptions};

#[derive(Debug, Args)]
pub struct CalendarArgs {
    #[command(subcommand)]
    pub command: CalendarCommand,
}

#[derive(Debug, Subcommand)]
pub enum CalendarCommand {
    /// Store an event and mark attendance for No School / Teachers Only days
    Add(AddArgs),
    /// List stored events as lock rules
    List,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub title: String,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day, inclusive; defaults to --start
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// "No School", "Teachers Only" or "Custom"
    #[arg(long, default_value = "No School")]
    pub kind: String,
}

pub fn execute(options: &SessionOptions, args: CalendarArgs) -> CliResult<()> {
    match args.command {
        CalendarCommand::Add(add_args) => execute_add(options, add_args),
        CalendarCommand::List => execute_list(options),
    }
}

fn execute_add(options: &SessionOptions, args: AddArgs) -> CliResult<()> {
    let end = args.end.unwrap_or(args.start);
    if end < args.start {
        return Err("--end must not be before --start".into());
    }
    let kind: LockKind = args.kind.parse().map_err(ExError::from)?;
    let rule = LockRule::new(args.start, end, kind, args.title);

    let mut session = session::open(options)?;
    let (outcome, report) = session
        .engine
        .create_calendar_event(&session.ctx, &rule)
        .map_err(ExError::from)?;

    println!("Created CalendarEvent {}", outcome.entity_id);
    if kind.propagates_to_attendance() {
        println!(
            "Marked {} attendance rows \"No School\" ({} failed)",
            report.succeeded_count(),
            report.failed_count()
        );
    }
    for (index, err) in &report.failed {
        eprintln!("  row {}: {}", index, ExError::from(err.clone()));
    }
    Ok(())
}

fn execute_list(options: &SessionOptions) -> CliResult<()> {
    let session = session::open(options)?;
    let calendar = calendar_from_records(session.engine.store()).map_err(ExError::from)?;

    for rule in calendar.rules() {
        println!("{} .. {}  {}  {}", rule.start_date, rule.end_date, rule.kind, rule.label);
    }
    Ok(())
}
