//! Embedded SQL migrations

/// One migration script, compiled into the binary
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All embedded migrations in application order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_records_and_audit",
        sql: include_str!("../../migrations/001_records_and_audit.sql"),
    }]
}
