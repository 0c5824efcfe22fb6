//! Append-only audit ledger in the `audit_logs` table

use std::rc::Rc;

use chrono::{DateTime, Utc};
use registree_core::audit_trail::AuditLedger;
use registree_core::errors::{RegisTreeError, Result as CoreResult};
use registree_core::model::NewAuditRecord;
use registree_core::{AuditAction, AuditId, AuditLogRecord, EntityId, EntityType, Snapshot};
use rusqlite::{params, Connection, Row};

use crate::errors::{from_rusqlite, into_core};

const SELECT_COLUMNS: &str =
    "SELECT id, actor, action, entity, entity_id, timestamp, before_json, after_json FROM audit_logs";

/// [`AuditLedger`] writing one row per record
///
/// The table has no update or delete path; ids come from AUTOINCREMENT.
pub struct SqliteAuditLedger {
    conn: Rc<Connection>,
}

impl SqliteAuditLedger {
    pub fn new(conn: Rc<Connection>) -> Self {
        Self { conn }
    }

    fn select(&self, clause: &str, args: &[&dyn rusqlite::ToSql]) -> CoreResult<Vec<AuditLogRecord>> {
        let sql = format!("{} {} ORDER BY id", SELECT_COLUMNS, clause);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| into_core(from_rusqlite(e)))?;
        let raw = stmt
            .query_map(args, RawAuditRow::read)
            .map_err(|e| into_core(from_rusqlite(e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| into_core(from_rusqlite(e)))?;

        raw.into_iter().map(RawAuditRow::decode).collect()
    }
}

struct RawAuditRow {
    id: i64,
    actor: String,
    action: String,
    entity: String,
    entity_id: i64,
    timestamp: String,
    before_json: Option<String>,
    after_json: Option<String>,
}

impl RawAuditRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            actor: row.get(1)?,
            action: row.get(2)?,
            entity: row.get(3)?,
            entity_id: row.get(4)?,
            timestamp: row.get(5)?,
            before_json: row.get(6)?,
            after_json: row.get(7)?,
        })
    }

    fn decode(self) -> CoreResult<AuditLogRecord> {
        let snapshot = |raw: Option<String>| -> CoreResult<Option<Snapshot>> {
            raw.map(|json| serde_json::from_str(&json)).transpose().map_err(Into::into)
        };
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| RegisTreeError::Serialization {
                message: format!("audit record {}: bad timestamp: {}", self.id, e),
            })?
            .with_timezone(&Utc);

        Ok(AuditLogRecord {
            id: AuditId(self.id as u64),
            actor: self.actor,
            action: self.action.parse::<AuditAction>()?,
            entity_type: self.entity.parse::<EntityType>()?,
            entity_id: EntityId(self.entity_id),
            timestamp,
            before: snapshot(self.before_json)?,
            after: snapshot(self.after_json)?,
        })
    }
}

impl AuditLedger for SqliteAuditLedger {
    fn append(&mut self, record: NewAuditRecord) -> CoreResult<AuditLogRecord> {
        let before = record.before.as_ref().map(serde_json::to_string).transpose()?;
        let after = record.after.as_ref().map(serde_json::to_string).transpose()?;

        self.conn
            .execute(
                "INSERT INTO audit_logs (actor, action, entity, entity_id, timestamp, before_json, after_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.actor,
                    record.action.as_str(),
                    record.entity_type.as_str(),
                    record.entity_id.0,
                    record.timestamp.to_rfc3339(),
                    before,
                    after,
                ],
            )
            .map_err(|e| into_core(from_rusqlite(e)))?;

        let id = AuditId(self.conn.last_insert_rowid() as u64);
        Ok(record.with_id(id))
    }

    fn all(&self) -> CoreResult<Vec<AuditLogRecord>> {
        self.select("", &[])
    }

    fn for_entity(&self, entity_type: EntityType, entity_id: EntityId) -> CoreResult<Vec<AuditLogRecord>> {
        self.select(
            "WHERE entity = ?1 AND entity_id = ?2",
            &[&entity_type.as_str(), &entity_id.0],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::migrations::apply_migrations;

    fn ledger() -> SqliteAuditLedger {
        let mut conn = db::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        SqliteAuditLedger::new(Rc::new(conn))
    }

    fn new_record(action: AuditAction, id: i64) -> NewAuditRecord {
        let fields = Snapshot::new().with("name", "A");
        let (before, after) = match action {
            AuditAction::Create => (None, Some(fields)),
            AuditAction::Update => (Some(fields.clone()), Some(fields)),
            AuditAction::Delete => (Some(fields), None),
        };
        NewAuditRecord {
            actor: "ana".to_string(),
            action,
            entity_type: EntityType::Class,
            entity_id: EntityId(id),
            timestamp: Utc::now(),
            before,
            after,
        }
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let mut ledger = ledger();
        let first = ledger.append(new_record(AuditAction::Create, 1)).unwrap();
        let second = ledger.append(new_record(AuditAction::Delete, 1)).unwrap();
        assert!(second.id > first.id);

        let all = ledger.all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].action, AuditAction::Delete);
        assert!(all[1].after.is_none());
    }

    #[test]
    fn test_for_entity_filters_rows() {
        let mut ledger = ledger();
        ledger.append(new_record(AuditAction::Create, 1)).unwrap();
        ledger.append(new_record(AuditAction::Create, 2)).unwrap();
        ledger.append(new_record(AuditAction::Update, 1)).unwrap();

        let history = ledger.for_entity(EntityType::Class, EntityId(1)).unwrap();
        let actions: Vec<_> = history.iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![AuditAction::Create, AuditAction::Update]);
    }

    #[test]
    fn test_shapeless_row_rejected_by_schema() {
        let ledger = ledger();
        let err = ledger.conn.execute(
            "INSERT INTO audit_logs (actor, action, entity, entity_id, timestamp) VALUES ('x', 'update', 'Class', 1, '2025-01-01T00:00:00Z')",
            [],
        );
        assert!(err.is_err());
    }
}
