pub mod audit;
pub mod batch;
pub mod lock;
pub mod record;
pub mod snapshot;

pub use audit::{AuditAction, AuditId, AuditLogRecord, NewAuditRecord};
pub use batch::BatchReport;
pub use lock::{ConsumerKind, LockKind, LockReason, LockRule, LockScope, WeeklySchedule};
pub use record::{EntityId, EntityType, Record};
pub use snapshot::{FieldValue, Snapshot};
