#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::NaiveDate;
use registree_core::audit_trail::{AuditLedger, MemoryAuditLedger};
use registree_core::model::NewAuditRecord;
use registree_core::ops::RecordFilter;
use registree_core::{
    AuditLogRecord, AuditTrail, CommandCoordinator, EntityId, EntityType, LockPolicyEngine,
    LockRule, MemoryStore, Record, RecordStore, RegisTreeError, Result, Snapshot, StaticCalendar,
    WeeklySchedule,
};

#[allow(dead_code)]
pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Coordinator over empty in-memory storage and an empty Mon–Fri calendar
#[allow(dead_code)]
pub fn coordinator() -> CommandCoordinator<MemoryStore> {
    coordinator_with_rules(vec![])
}

#[allow(dead_code)]
pub fn coordinator_with_rules(rules: Vec<LockRule>) -> CommandCoordinator<MemoryStore> {
    coordinator_over(MemoryStore::new(), rules)
}

#[allow(dead_code)]
pub fn coordinator_over<S: RecordStore>(store: S, rules: Vec<LockRule>) -> CommandCoordinator<S> {
    CommandCoordinator::new(
        store,
        AuditTrail::in_memory(),
        LockPolicyEngine::new(Box::new(StaticCalendar::new(rules, WeeklySchedule::default()))),
    )
}

#[allow(dead_code)]
pub fn named(name: &str) -> Snapshot {
    Snapshot::new().with("name", name)
}

/// Every record currently in the store for one type, in id order
#[allow(dead_code)]
pub fn rows<S: RecordStore>(coord: &CommandCoordinator<S>, ty: EntityType) -> Vec<Record> {
    coord.store().query(ty, &|_| true).unwrap()
}

/// Switch shared between a test and a failing double
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct FailSwitch(Rc<Cell<bool>>);

#[allow(dead_code)]
impl FailSwitch {
    pub fn arm(&self) {
        self.0.set(true);
    }

    pub fn disarm(&self) {
        self.0.set(false);
    }

    pub fn armed(&self) -> bool {
        self.0.get()
    }
}

/// Memory store whose writes fail while its switch is armed
#[allow(dead_code)]
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_writes: FailSwitch,
}

impl FlakyStore {
    fn guard(&self) -> Result<()> {
        if self.fail_writes.armed() {
            return Err(RegisTreeError::persistence("disk unavailable"));
        }
        Ok(())
    }
}

impl RecordStore for FlakyStore {
    fn get(&self, entity_type: EntityType, id: EntityId) -> Result<Option<Record>> {
        self.inner.get(entity_type, id)
    }

    fn query(&self, entity_type: EntityType, filter: RecordFilter<'_>) -> Result<Vec<Record>> {
        self.inner.query(entity_type, filter)
    }

    fn add(&mut self, entity_type: EntityType, id: Option<EntityId>, values: Snapshot) -> Result<EntityId> {
        self.guard()?;
        self.inner.add(entity_type, id, values)
    }

    fn update(&mut self, entity_type: EntityType, id: EntityId, values: Snapshot) -> Result<()> {
        self.guard()?;
        self.inner.update(entity_type, id, values)
    }

    fn delete(&mut self, entity_type: EntityType, id: EntityId) -> Result<()> {
        self.guard()?;
        self.inner.delete(entity_type, id)
    }
}

/// Memory ledger whose appends fail while its switch is armed
#[allow(dead_code)]
#[derive(Default)]
pub struct FlakyLedger {
    pub inner: MemoryAuditLedger,
    pub fail_appends: FailSwitch,
}

impl AuditLedger for FlakyLedger {
    fn append(&mut self, record: NewAuditRecord) -> Result<AuditLogRecord> {
        if self.fail_appends.armed() {
            return Err(RegisTreeError::persistence("ledger unavailable"));
        }
        self.inner.append(record)
    }

    fn all(&self) -> Result<Vec<AuditLogRecord>> {
        self.inner.all()
    }
}

/// Store handle shared with the test, standing in for another writer
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct SharedStore(pub Rc<RefCell<MemoryStore>>);

impl RecordStore for SharedStore {
    fn get(&self, entity_type: EntityType, id: EntityId) -> Result<Option<Record>> {
        self.0.borrow().get(entity_type, id)
    }

    fn query(&self, entity_type: EntityType, filter: RecordFilter<'_>) -> Result<Vec<Record>> {
        self.0.borrow().query(entity_type, filter)
    }

    fn add(&mut self, entity_type: EntityType, id: Option<EntityId>, values: Snapshot) -> Result<EntityId> {
        self.0.borrow_mut().add(entity_type, id, values)
    }

    fn update(&mut self, entity_type: EntityType, id: EntityId, values: Snapshot) -> Result<()> {
        self.0.borrow_mut().update(entity_type, id, values)
    }

    fn delete(&mut self, entity_type: EntityType, id: EntityId) -> Result<()> {
        self.0.borrow_mut().delete(entity_type, id)
    }
}
