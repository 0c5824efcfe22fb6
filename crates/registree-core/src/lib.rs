//! RegisTree Core - change tracking for school records
//!
//! Everything an edit passes through between a view and storage:
//! - [`CommandCoordinator`]: lock check, persist, audit, and undo history for
//!   every mutation
//! - [`ChangeLog`]: undo/redo over plain [`ChangeStep`] values
//! - [`AuditTrail`]: append-only before/after ledger
//! - [`LockPolicyEngine`]: calendar and weekly-schedule date locks
//! - [`DirtyStateTracker`]: pending grid edits and the auto-save toggle
//!
//! Storage sits behind [`RecordStore`] and [`AuditLedger`]; this crate ships
//! in-memory implementations, `registree-store` ships SQLite ones.

pub mod audit_trail;
pub mod calendar_sync;
pub mod changelog;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod dirty;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod policy;

/// Log field names, re-exported for the logging macros
pub use registree_core_types::schema;

pub use audit_trail::{AuditLedger, AuditTrail, MemoryAuditLedger};
pub use changelog::{ChangeLog, ChangeLogEntry, ChangeSet, ChangeStep, StepExecutor};
pub use commands::{resolve_intent, MutationIntent, ResolvedIntent, RowEdit};
pub use config::EngineConfig;
pub use coordinator::{CommandCoordinator, MutationOutcome};
pub use dirty::{AutoSaveFlag, CommitOutcome, DirtyObserver, DirtyRow, DirtyStateTracker, RowId};
pub use errors::{ExError, ExErrorKind, RegisTreeError, Result};
pub use model::{
    AuditAction, AuditId, AuditLogRecord, BatchReport, ConsumerKind, EntityId, EntityType,
    FieldValue, LockKind, LockReason, LockRule, LockScope, Record, Snapshot, WeeklySchedule,
};
pub use ops::{MemoryStore, RecordStore};
pub use policy::{CalendarSource, LockPolicyEngine, StaticCalendar};
pub use registree_core_types::RequestContext;
