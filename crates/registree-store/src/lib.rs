//! RegisTree Store - SQLite persistence for the change-tracking engine
//!
//! Provides:
//! - Connection helpers and a checksummed migration runner
//! - [`SqliteRecordStore`], a `RecordStore` over one generic `records` table
//! - [`SqliteAuditLedger`], an append-only `AuditLedger` over `audit_logs`
//! - [`load_calendar`] for rebuilding lock rules from stored events
//!
//! Both storage types share one `Rc<Connection>`, see [`open_engine`].

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

use std::path::Path;
use std::rc::Rc;

use registree_core::{AuditTrail, CommandCoordinator, LockPolicyEngine};

pub use errors::Result;
pub use repo::{load_calendar, SqliteAuditLedger, SqliteRecordStore};

/// Coordinator wired to a migrated database file
///
/// `locks` turns the stored calendar into the lock engine, typically
/// `|calendar| config.lock_engine(calendar)`.
pub fn open_engine<P: AsRef<Path>>(
    path: P,
    locks: impl FnOnce(CalendarBox) -> registree_core::Result<LockPolicyEngine>,
) -> Result<CommandCoordinator<SqliteRecordStore>> {
    let conn = Rc::new(db::open_ready(path)?);
    let calendar = load_calendar(conn.clone()).map_err(registree_core::ExError::from)?;
    let locks = locks(Box::new(calendar)).map_err(registree_core::ExError::from)?;

    Ok(CommandCoordinator::new(
        SqliteRecordStore::new(conn.clone()),
        AuditTrail::new(Box::new(SqliteAuditLedger::new(conn))),
        locks,
    ))
}

/// Calendar handed to the lock-engine factory in [`open_engine`]
pub type CalendarBox = Box<dyn registree_core::CalendarSource>;
