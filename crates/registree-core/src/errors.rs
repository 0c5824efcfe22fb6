use chrono::NaiveDate;
use registree_core_types::{RequestId, TraceId};
use thiserror::Error;

use crate::model::{AuditAction, EntityId, EntityType, LockKind};

/// Result type alias using RegisTreeError
pub type Result<T> = std::result::Result<T, RegisTreeError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable code that callers (dialogs, the CLI, tests)
/// match on instead of parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    InvalidInput,
    NotFound,
    AlreadyExists,

    // Temporal access
    LockViolation,

    // Undo/redo
    StaleReference,

    // Ledger
    AuditInvariant,

    // Integration/IO
    Persistence,
    Serialization,
    Io,
    Config,

    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::LockViolation => "ERR_LOCK_VIOLATION",
            ExErrorKind::StaleReference => "ERR_STALE_REFERENCE",
            ExErrorKind::AuditInvariant => "ERR_AUDIT_INVARIANT",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus whatever context was known where the
/// error surfaced (operation, target entity, correlation ids).
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_type: Option<String>,
    entity_id: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_type: None,
            entity_id: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        match (&self.entity_type, &self.entity_id) {
            (Some(ty), Some(id)) => write!(f, " ({} {})", ty, id)?,
            (None, Some(id)) => write!(f, " (entity_id: {})", id)?,
            (Some(ty), None) => write!(f, " ({})", ty)?,
            (None, None) => {}
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for engine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegisTreeError {
    /// Target record does not exist in the record store
    #[error("{entity_type} {entity_id} not found")]
    RecordNotFound {
        entity_type: EntityType,
        entity_id: EntityId,
    },

    /// Explicit-id insert collided with an existing record
    #[error("{entity_type} {entity_id} already exists")]
    RecordAlreadyExists {
        entity_type: EntityType,
        entity_id: EntityId,
    },

    /// The date is locked for the consumer making the mutation
    #[error("{date} is locked until policy changes ({kind}: {label})")]
    LockViolation {
        date: NaiveDate,
        kind: LockKind,
        label: String,
    },

    /// Undo/redo target no longer matches the recorded state
    #[error("Stale reference to {entity_type} {entity_id}: {reason}")]
    StaleReference {
        entity_type: EntityType,
        entity_id: EntityId,
        reason: String,
    },

    /// before/after snapshots do not fit the audit action
    #[error("Audit record for '{action}' rejected: {reason}")]
    AuditInvariant { action: AuditAction, reason: String },

    /// Malformed mutation intent (missing target id, empty values, ambiguous key)
    #[error("Invalid intent: {reason}")]
    InvalidIntent { reason: String },

    /// Record store or audit ledger failed to persist
    #[error("Persistence failure: {message}")]
    Persistence { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RegisTreeError {
    /// Shorthand for the stable kind of this error
    pub fn kind(&self) -> ExErrorKind {
        ExError::from(self.clone()).kind()
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        RegisTreeError::Persistence {
            message: message.into(),
        }
    }
}

impl From<RegisTreeError> for ExError {
    fn from(err: RegisTreeError) -> Self {
        match err {
            RegisTreeError::RecordNotFound {
                entity_type,
                entity_id,
            } => ExError::new(ExErrorKind::NotFound)
                .with_entity_type(entity_type.as_str())
                .with_entity_id(entity_id.to_string())
                .with_message("Record not found"),

            RegisTreeError::RecordAlreadyExists {
                entity_type,
                entity_id,
            } => ExError::new(ExErrorKind::AlreadyExists)
                .with_entity_type(entity_type.as_str())
                .with_entity_id(entity_id.to_string())
                .with_message("Record already exists"),

            RegisTreeError::LockViolation { date, kind, label } => {
                ExError::new(ExErrorKind::LockViolation).with_message(format!(
                    "{} is locked until policy changes ({}: {})",
                    date, kind, label
                ))
            }

            RegisTreeError::StaleReference {
                entity_type,
                entity_id,
                reason,
            } => ExError::new(ExErrorKind::StaleReference)
                .with_entity_type(entity_type.as_str())
                .with_entity_id(entity_id.to_string())
                .with_message(reason),

            RegisTreeError::AuditInvariant { action, reason } => {
                ExError::new(ExErrorKind::AuditInvariant)
                    .with_op("audit_record")
                    .with_message(format!("{}: {}", action, reason))
            }

            RegisTreeError::InvalidIntent { reason } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(reason)
            }

            RegisTreeError::Persistence { message } => {
                ExError::new(ExErrorKind::Persistence).with_message(message)
            }

            RegisTreeError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            RegisTreeError::InvalidConfig { message } => {
                ExError::new(ExErrorKind::Config).with_message(message)
            }

            RegisTreeError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for RegisTreeError {
    fn from(err: serde_json::Error) -> Self {
        RegisTreeError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (ExErrorKind::LockViolation, "ERR_LOCK_VIOLATION"),
            (ExErrorKind::StaleReference, "ERR_STALE_REFERENCE"),
            (ExErrorKind::AuditInvariant, "ERR_AUDIT_INVARIANT"),
            (ExErrorKind::Persistence, "ERR_PERSISTENCE"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_display_includes_target() {
        let err: ExError = RegisTreeError::RecordNotFound {
            entity_type: EntityType::Student,
            entity_id: EntityId(7),
        }
        .into();
        let text = err.to_string();
        assert!(text.starts_with("[ERR_NOT_FOUND]"));
        assert!(text.contains("Student 7"));
    }

    #[test]
    fn test_source_chain_exposed() {
        let inner = ExError::new(ExErrorKind::Io).with_message("disk full");
        let outer = ExError::new(ExErrorKind::Persistence).with_source(inner);
        let source = std::error::Error::source(&outer).expect("source should be set");
        assert!(source.to_string().contains("disk full"));
    }
}
