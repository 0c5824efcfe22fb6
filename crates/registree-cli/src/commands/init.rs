//! Database initialization
//!
//! Usage: registree init [--db PATH] [--config PATH]

use registree_core::calendar_sync::SCHOOL_DAYS_FIELD;
use registree_core::{EntityType, ExError, MutationIntent, RecordStore, Snapshot};

use crate::session::{self, CliResult, SessionOptions};

/// Migrate the database and seed the `Settings` row from config
///
/// An existing `Settings` row is left alone so re-running is harmless.
pub fn execute(options: &SessionOptions) -> CliResult<()> {
    let mut session = session::open(options)?;
    let school_days = session.config.weekly_schedule().map_err(ExError::from)?.day_names();

    let existing = session
        .engine
        .store()
        .query(EntityType::Settings, &|_| true)
        .map_err(ExError::from)?;
    if existing.is_empty() {
        let fields = Snapshot::new().with(SCHOOL_DAYS_FIELD, serde_json::to_string(&school_days)?);
        session
            .engine
            .execute(&session.ctx, MutationIntent::create(EntityType::Settings, fields))
            .map_err(ExError::from)?;
        session.engine.refresh_calendar().map_err(ExError::from)?;
    }

    println!(
        "Initialized {} (school days: {})",
        options.db.display(),
        session.engine.locks().weekly_schedule().day_names().join(",")
    );
    Ok(())
}
