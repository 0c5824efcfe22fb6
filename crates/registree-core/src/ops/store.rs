use std::collections::{BTreeMap, HashMap};

use crate::errors::{RegisTreeError, Result};
use crate::model::{EntityId, EntityType, Record, Snapshot};

/// Row filter passed to [`RecordStore::query`]
pub type RecordFilter<'a> = &'a dyn Fn(&Record) -> bool;

/// Persistence boundary for domain records
///
/// Implementations report their own failures as `RegisTreeError::Persistence`
/// and never retry.
pub trait RecordStore {
    /// Fetch one record; `Ok(None)` when absent
    fn get(&self, entity_type: EntityType, id: EntityId) -> Result<Option<Record>>;

    /// All records of a type accepted by `filter`, in id order
    fn query(&self, entity_type: EntityType, filter: RecordFilter<'_>) -> Result<Vec<Record>>;

    /// Insert a record, allocating an id unless one is given
    ///
    /// # Errors
    ///
    /// `RecordAlreadyExists` when `id` is given and taken.
    fn add(
        &mut self,
        entity_type: EntityType,
        id: Option<EntityId>,
        values: Snapshot,
    ) -> Result<EntityId>;

    /// Replace the full field set of an existing record
    ///
    /// # Errors
    ///
    /// `RecordNotFound` when the record does not exist.
    fn update(&mut self, entity_type: EntityType, id: EntityId, values: Snapshot) -> Result<()>;

    /// # Errors
    ///
    /// `RecordNotFound` when the record does not exist.
    fn delete(&mut self, entity_type: EntityType, id: EntityId) -> Result<()>;

    /// Serialize a record into the state captured by audit and undo
    fn snapshot(&self, record: &Record) -> Snapshot {
        record.fields.clone()
    }
}

/// In-memory record store
///
/// Ids are allocated per entity type, starting at 1 and never reused, even
/// after the record holding the highest id is deleted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<EntityType, BTreeMap<EntityId, Snapshot>>,
    next_ids: HashMap<EntityType, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records of one type
    pub fn count(&self, entity_type: EntityType) -> usize {
        self.tables.get(&entity_type).map_or(0, BTreeMap::len)
    }

    fn allocate_id(&mut self, entity_type: EntityType) -> Result<EntityId> {
        let next = self.next_ids.entry(entity_type).or_insert(1);
        let id = EntityId(*next);
        *next = id.successor(entity_type)?.0;
        Ok(id)
    }

    fn note_explicit_id(&mut self, entity_type: EntityType, id: EntityId) -> Result<()> {
        let after = id.successor(entity_type)?;
        let next = self.next_ids.entry(entity_type).or_insert(1);
        if after.0 > *next {
            *next = after.0;
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, entity_type: EntityType, id: EntityId) -> Result<Option<Record>> {
        Ok(self
            .tables
            .get(&entity_type)
            .and_then(|table| table.get(&id))
            .map(|fields| Record::new(entity_type, id, fields.clone())))
    }

    fn query(&self, entity_type: EntityType, filter: RecordFilter<'_>) -> Result<Vec<Record>> {
        let Some(table) = self.tables.get(&entity_type) else {
            return Ok(Vec::new());
        };
        Ok(table
            .iter()
            .map(|(id, fields)| Record::new(entity_type, *id, fields.clone()))
            .filter(|record| filter(record))
            .collect())
    }

    fn add(
        &mut self,
        entity_type: EntityType,
        id: Option<EntityId>,
        values: Snapshot,
    ) -> Result<EntityId> {
        let id = match id {
            Some(explicit) => {
                let taken = self
                    .tables
                    .get(&entity_type)
                    .is_some_and(|table| table.contains_key(&explicit));
                if taken {
                    return Err(RegisTreeError::RecordAlreadyExists {
                        entity_type,
                        entity_id: explicit,
                    });
                }
                self.note_explicit_id(entity_type, explicit)?;
                explicit
            }
            None => self.allocate_id(entity_type)?,
        };
        self.tables.entry(entity_type).or_default().insert(id, values);
        Ok(id)
    }

    fn update(&mut self, entity_type: EntityType, id: EntityId, values: Snapshot) -> Result<()> {
        let slot = self
            .tables
            .get_mut(&entity_type)
            .and_then(|table| table.get_mut(&id))
            .ok_or(RegisTreeError::RecordNotFound {
                entity_type,
                entity_id: id,
            })?;
        *slot = values;
        Ok(())
    }

    fn delete(&mut self, entity_type: EntityType, id: EntityId) -> Result<()> {
        self.tables
            .get_mut(&entity_type)
            .and_then(|table| table.remove(&id))
            .map(|_| ())
            .ok_or(RegisTreeError::RecordNotFound {
                entity_type,
                entity_id: id,
            })
    }
}
