//! Audit history
//!
//! Usage: registree history <ENTITY_TYPE> <ID>

use clap::Args;
use registree_core::{EntityId, EntityType, ExError};

use crate::commands::values::render;
use crate::session::{self, CliResult, SessionOptions};

#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub entity_type: EntityType,
    pub id: i64,
}

pub fn execute(options: &SessionOptions, args: HistoryArgs) -> CliResult<()> {
    let session = session::open(options)?;
    let records = session
        .engine
        .history(args.entity_type, EntityId(args.id))
        .map_err(ExError::from)?;

    for record in records {
        let state = match (&record.before, &record.after) {
            (_, Some(after)) => render(after),
            (Some(before), None) => format!("(was {})", render(before)),
            (None, None) => String::new(),
        };
        println!(
            "#{} {} {} {} {}",
            record.id,
            record.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
            record.actor,
            record.action,
            state
        );
    }
    Ok(())
}
