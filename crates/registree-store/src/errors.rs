//! Error handling for registree-store
//!
//! Store helpers speak `ExError`; trait impls for the engine hand back
//! `RegisTreeError::Persistence` via [`into_core`].

use registree_core::errors::{ExError, ExErrorKind, RegisTreeError};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Stored JSON that no longer parses as a snapshot
pub fn corrupt_row(table: &str, key: &str, err: serde_json::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("decode_row")
        .with_entity_id(key.to_string())
        .with_message(format!("{}: {}", table, err))
}

/// Collapse a store error into the engine's persistence variant
pub fn into_core(err: ExError) -> RegisTreeError {
    RegisTreeError::persistence(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rusqlite_errors_are_persistence() {
        let err = from_rusqlite(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.code(), "ERR_PERSISTENCE");
        assert_eq!(err.op(), Some("sqlite"));
    }

    #[test]
    fn test_into_core_keeps_message() {
        let core = into_core(migration_error("001", "syntax error"));
        match core {
            RegisTreeError::Persistence { message } => {
                assert!(message.contains("Migration 001 failed: syntax error"))
            }
            other => panic!("expected Persistence, got {:?}", other),
        }
    }
}
