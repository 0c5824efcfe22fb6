//! Append-only audit trail
//!
//! Every persisted-row mutation produces exactly one [`AuditLogRecord`]
//! holding the row's state before and after. Records are never updated or
//! deleted; there is deliberately no API for either.

use chrono::Utc;
use registree_core_types::SYSTEM_ACTOR;

use crate::errors::{RegisTreeError, Result};
use crate::model::{
    AuditAction, AuditId, AuditLogRecord, EntityId, EntityType, NewAuditRecord, Snapshot,
};

/// Storage backend for audit records
pub trait AuditLedger {
    /// Persist a record and assign its id
    fn append(&mut self, record: NewAuditRecord) -> Result<AuditLogRecord>;

    /// Every record in append order
    fn all(&self) -> Result<Vec<AuditLogRecord>>;

    /// Records for one entity in append order
    fn for_entity(&self, entity_type: EntityType, entity_id: EntityId) -> Result<Vec<AuditLogRecord>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|r| r.entity_type == entity_type && r.entity_id == entity_id)
            .collect())
    }
}

/// Ledger kept in process memory
#[derive(Debug, Default)]
pub struct MemoryAuditLedger {
    records: Vec<AuditLogRecord>,
}

impl MemoryAuditLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLedger for MemoryAuditLedger {
    fn append(&mut self, record: NewAuditRecord) -> Result<AuditLogRecord> {
        let id = AuditId(self.records.len() as u64 + 1);
        let stored = record.with_id(id);
        self.records.push(stored.clone());
        Ok(stored)
    }

    fn all(&self) -> Result<Vec<AuditLogRecord>> {
        Ok(self.records.clone())
    }
}

/// Validating front end over an [`AuditLedger`]
pub struct AuditTrail {
    ledger: Box<dyn AuditLedger>,
}

impl AuditTrail {
    pub fn new(ledger: Box<dyn AuditLedger>) -> Self {
        Self { ledger }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryAuditLedger::new()))
    }

    /// Append one record for a persisted-row mutation
    ///
    /// A blank actor is recorded as `"System"`.
    ///
    /// # Errors
    ///
    /// `AuditInvariant` when `before`/`after` do not fit `action`; nothing
    /// is appended in that case. Ledger failures propagate unchanged.
    pub fn record(
        &mut self,
        actor: &str,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: EntityId,
        before: Option<Snapshot>,
        after: Option<Snapshot>,
    ) -> Result<AuditId> {
        validate_shape(action, before.is_some(), after.is_some())?;

        let actor = if actor.trim().is_empty() {
            SYSTEM_ACTOR.to_string()
        } else {
            actor.to_string()
        };

        let stored = self.ledger.append(NewAuditRecord {
            actor,
            action,
            entity_type,
            entity_id,
            timestamp: Utc::now(),
            before,
            after,
        })?;
        Ok(stored.id)
    }

    /// Records for one entity, oldest first
    pub fn history(&self, entity_type: EntityType, entity_id: EntityId) -> Result<Vec<AuditLogRecord>> {
        self.ledger.for_entity(entity_type, entity_id)
    }

    pub fn records(&self) -> Result<Vec<AuditLogRecord>> {
        self.ledger.all()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.ledger.all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail").finish_non_exhaustive()
    }
}

fn validate_shape(action: AuditAction, has_before: bool, has_after: bool) -> Result<()> {
    match AuditAction::from_shape(has_before, has_after) {
        Some(implied) if implied == action => Ok(()),
        Some(implied) => Err(RegisTreeError::AuditInvariant {
            action,
            reason: format!("before/after shape describes '{}'", implied),
        }),
        None => Err(RegisTreeError::AuditInvariant {
            action,
            reason: "before and after are both absent".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(name: &str) -> Snapshot {
        Snapshot::new().with("name", name)
    }

    #[test]
    fn test_record_assigns_increasing_ids() {
        let mut trail = AuditTrail::in_memory();
        let a = trail
            .record("ana", AuditAction::Create, EntityType::Class, EntityId(1), None, Some(snap("A")))
            .unwrap();
        let b = trail
            .record(
                "ana",
                AuditAction::Update,
                EntityType::Class,
                EntityId(1),
                Some(snap("A")),
                Some(snap("B")),
            )
            .unwrap();
        assert!(b > a);
        assert_eq!(trail.len().unwrap(), 2);
    }

    #[test]
    fn test_shape_mismatch_rejected_without_append() {
        let mut trail = AuditTrail::in_memory();
        let err = trail
            .record("ana", AuditAction::Create, EntityType::Class, EntityId(1), Some(snap("A")), None)
            .unwrap_err();
        assert!(matches!(err, RegisTreeError::AuditInvariant { .. }));

        let err = trail
            .record("ana", AuditAction::Delete, EntityType::Class, EntityId(1), None, None)
            .unwrap_err();
        assert!(matches!(err, RegisTreeError::AuditInvariant { .. }));
        assert!(trail.is_empty().unwrap());
    }

    #[test]
    fn test_blank_actor_becomes_system() {
        let mut trail = AuditTrail::in_memory();
        trail
            .record("  ", AuditAction::Create, EntityType::Student, EntityId(3), None, Some(snap("S")))
            .unwrap();
        assert_eq!(trail.records().unwrap()[0].actor, "System");
    }

    #[test]
    fn test_history_filters_by_entity() {
        let mut trail = AuditTrail::in_memory();
        trail
            .record("a", AuditAction::Create, EntityType::Class, EntityId(1), None, Some(snap("A")))
            .unwrap();
        trail
            .record("a", AuditAction::Create, EntityType::Class, EntityId(2), None, Some(snap("B")))
            .unwrap();
        trail
            .record("a", AuditAction::Delete, EntityType::Class, EntityId(1), Some(snap("A")), None)
            .unwrap();

        let history = trail.history(EntityType::Class, EntityId(1)).unwrap();
        let actions: Vec<_> = history.iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![AuditAction::Create, AuditAction::Delete]);
    }
}
