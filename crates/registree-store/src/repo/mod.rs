//! SQLite implementations of the engine's storage seams

pub mod audit_ledger;
pub mod calendar;
pub mod record_store;

pub use audit_ledger::SqliteAuditLedger;
pub use calendar::load_calendar;
pub use record_store::SqliteRecordStore;
