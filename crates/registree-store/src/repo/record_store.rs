//! Records persisted as JSON snapshots, one row per (entity_type, id)

use std::rc::Rc;

use registree_core::errors::{RegisTreeError, Result as CoreResult};
use registree_core::ops::{RecordFilter, RecordStore};
use registree_core::{EntityId, EntityType, Record, Snapshot};
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::{corrupt_row, from_rusqlite, into_core, Result};

/// [`RecordStore`] over the `records` table
///
/// Shares its connection with the audit ledger so both see one database.
pub struct SqliteRecordStore {
    conn: Rc<Connection>,
}

impl SqliteRecordStore {
    pub fn new(conn: Rc<Connection>) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn load(&self, entity_type: EntityType, id: EntityId) -> Result<Option<Record>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT fields_json FROM records WHERE entity_type = ?1 AND id = ?2",
                params![entity_type.as_str(), id.0],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;

        raw.map(|json| decode(entity_type, id, &json)).transpose()
    }

    fn load_all(&self, entity_type: EntityType) -> Result<Vec<Record>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, fields_json FROM records WHERE entity_type = ?1 ORDER BY id")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([entity_type.as_str()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        rows.into_iter()
            .map(|(id, json)| decode(entity_type, EntityId(id), &json))
            .collect()
    }

    fn exists(&self, entity_type: EntityType, id: EntityId) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT 1 FROM records WHERE entity_type = ?1 AND id = ?2",
                params![entity_type.as_str(), id.0],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(from_rusqlite)
    }

    /// Next id for `entity_type`, advancing the sequence
    fn allocate_id(&self, entity_type: EntityType) -> CoreResult<EntityId> {
        let next: Option<i64> = self
            .conn
            .query_row(
                "SELECT next_id FROM record_sequences WHERE entity_type = ?1",
                [entity_type.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| into_core(from_rusqlite(e)))?;
        let id = EntityId(next.unwrap_or(1));
        self.bump_sequence(entity_type, id.successor(entity_type)?)
            .map_err(into_core)?;
        Ok(id)
    }

    /// Make sure the sequence never hands out anything below `next`
    fn bump_sequence(&self, entity_type: EntityType, next: EntityId) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO record_sequences (entity_type, next_id) VALUES (?1, ?2)
                 ON CONFLICT(entity_type) DO UPDATE SET
                    next_id = MAX(next_id, excluded.next_id)",
                params![entity_type.as_str(), next.0],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    fn insert(&self, entity_type: EntityType, id: Option<EntityId>, values: &Snapshot) -> CoreResult<EntityId> {
        let id = match id {
            Some(explicit) => {
                if self.exists(entity_type, explicit).map_err(into_core)? {
                    return Err(RegisTreeError::RecordAlreadyExists {
                        entity_type,
                        entity_id: explicit,
                    });
                }
                self.bump_sequence(entity_type, explicit.successor(entity_type)?)
                    .map_err(into_core)?;
                explicit
            }
            None => self.allocate_id(entity_type)?,
        };

        let json = serde_json::to_string(values)?;
        self.conn
            .execute(
                "INSERT INTO records (entity_type, id, fields_json) VALUES (?1, ?2, ?3)",
                params![entity_type.as_str(), id.0, json],
            )
            .map_err(|e| into_core(from_rusqlite(e)))?;
        Ok(id)
    }
}

fn decode(entity_type: EntityType, id: EntityId, json: &str) -> Result<Record> {
    let fields: Snapshot = serde_json::from_str(json)
        .map_err(|e| corrupt_row("records", &format!("{} {}", entity_type, id), e))?;
    Ok(Record::new(entity_type, id, fields))
}

impl RecordStore for SqliteRecordStore {
    fn get(&self, entity_type: EntityType, id: EntityId) -> CoreResult<Option<Record>> {
        self.load(entity_type, id).map_err(into_core)
    }

    fn query(&self, entity_type: EntityType, filter: RecordFilter<'_>) -> CoreResult<Vec<Record>> {
        Ok(self
            .load_all(entity_type)
            .map_err(into_core)?
            .into_iter()
            .filter(|record| filter(record))
            .collect())
    }

    fn add(&mut self, entity_type: EntityType, id: Option<EntityId>, values: Snapshot) -> CoreResult<EntityId> {
        self.insert(entity_type, id, &values)
    }

    fn update(&mut self, entity_type: EntityType, id: EntityId, values: Snapshot) -> CoreResult<()> {
        let json = serde_json::to_string(&values)?;
        let changed = self
            .conn
            .execute(
                "UPDATE records SET fields_json = ?3 WHERE entity_type = ?1 AND id = ?2",
                params![entity_type.as_str(), id.0, json],
            )
            .map_err(|e| into_core(from_rusqlite(e)))?;
        if changed == 0 {
            return Err(RegisTreeError::RecordNotFound {
                entity_type,
                entity_id: id,
            });
        }
        Ok(())
    }

    fn delete(&mut self, entity_type: EntityType, id: EntityId) -> CoreResult<()> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM records WHERE entity_type = ?1 AND id = ?2",
                params![entity_type.as_str(), id.0],
            )
            .map_err(|e| into_core(from_rusqlite(e)))?;
        if changed == 0 {
            return Err(RegisTreeError::RecordNotFound {
                entity_type,
                entity_id: id,
            });
        }
        Ok(())
    }
}
