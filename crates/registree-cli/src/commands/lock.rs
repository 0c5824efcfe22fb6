//! Lock queries
//!
//! Usage: registree lock check --date D [--consumer NAME] [--until D]

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use registree_core::ConsumerKind;

use crate::session::{self, CliResult, SessionOptions};

#[derive(Debug, Args)]
pub struct LockArgs {
    #[command(subcommand)]
    pub command: LockCommand,
}

#[derive(Debug, Subcommand)]
pub enum LockCommand {
    /// Report whether a date (or range) is locked for a consumer
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[arg(long)]
    pub date: NaiveDate,

    /// Report every locked day from --date through this date
    #[arg(long)]
    pub until: Option<NaiveDate>,

    #[arg(long, default_value = ConsumerKind::STUDENT_ROSTER)]
    pub consumer: String,
}

pub fn execute(options: &SessionOptions, args: LockArgs) -> CliResult<()> {
    match args.command {
        LockCommand::Check(check_args) => execute_check(options, check_args),
    }
}

fn execute_check(options: &SessionOptions, args: CheckArgs) -> CliResult<()> {
    let session = session::open(options)?;
    let consumer = ConsumerKind::new(args.consumer);

    match args.until {
        Some(until) => {
            for (date, reason) in session.engine.locks().locked_days(args.date, until, &consumer) {
                println!("{}: {}", date, reason);
            }
        }
        None => match session.engine.is_locked(args.date, &consumer) {
            Some(reason) => println!("{}: {}", args.date, reason),
            None => println!("{}: open", args.date),
        },
    }
    Ok(())
}
