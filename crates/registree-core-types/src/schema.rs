//! Canonical schema constants for structured logging
//!
//! Log consumers key on these names; changing one is a breaking change.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";
pub const FIELD_ACTOR: &str = "actor";

// Mutation targets
pub const FIELD_ENTITY_TYPE: &str = "entity_type";
pub const FIELD_ENTITY_ID: &str = "entity_id";
pub const FIELD_ACTION: &str = "action";
pub const FIELD_AUDIT_ID: &str = "audit_id";

// Lock evaluation
pub const FIELD_DATE: &str = "date";
pub const FIELD_CONSUMER: &str = "consumer";
pub const FIELD_LOCK_KIND: &str = "lock_kind";

// Batch sizes
pub const FIELD_SUCCEEDED: &str = "succeeded";
pub const FIELD_FAILED: &str = "failed";

pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
