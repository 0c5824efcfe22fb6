//! Mutation intents accepted by the command coordinator

use crate::model::{EntityId, EntityType, FieldValue, LockScope, Snapshot};

/// One row mutation requested by a view
///
/// Date-scoped intents (attendance for a day, a staff check-in) carry a
/// [`LockScope`]; the coordinator refuses them on locked dates.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationIntent {
    /// Insert a row; `id` restores a known id instead of allocating one
    Create {
        entity_type: EntityType,
        id: Option<EntityId>,
        values: Snapshot,
        lock_scope: Option<LockScope>,
    },

    /// Overwrite the listed fields, leaving the rest untouched
    Update {
        entity_type: EntityType,
        id: EntityId,
        values: Snapshot,
        lock_scope: Option<LockScope>,
    },

    Delete {
        entity_type: EntityType,
        id: EntityId,
        lock_scope: Option<LockScope>,
    },
}

impl MutationIntent {
    pub fn create(entity_type: EntityType, values: Snapshot) -> Self {
        MutationIntent::Create {
            entity_type,
            id: None,
            values,
            lock_scope: None,
        }
    }

    pub fn update(entity_type: EntityType, id: EntityId, values: Snapshot) -> Self {
        MutationIntent::Update {
            entity_type,
            id,
            values,
            lock_scope: None,
        }
    }

    pub fn delete(entity_type: EntityType, id: EntityId) -> Self {
        MutationIntent::Delete {
            entity_type,
            id,
            lock_scope: None,
        }
    }

    /// Attach the date and consumer this mutation is scoped to
    pub fn scoped(mut self, scope: LockScope) -> Self {
        match &mut self {
            MutationIntent::Create { lock_scope, .. }
            | MutationIntent::Update { lock_scope, .. }
            | MutationIntent::Delete { lock_scope, .. } => *lock_scope = Some(scope),
        }
        self
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            MutationIntent::Create { entity_type, .. }
            | MutationIntent::Update { entity_type, .. }
            | MutationIntent::Delete { entity_type, .. } => *entity_type,
        }
    }

    pub fn lock_scope(&self) -> Option<&LockScope> {
        match self {
            MutationIntent::Create { lock_scope, .. }
            | MutationIntent::Update { lock_scope, .. }
            | MutationIntent::Delete { lock_scope, .. } => lock_scope.as_ref(),
        }
    }
}

/// Single-field edit coming from a grid cell
///
/// The row is located by `key` (e.g. student, class and date for an
/// attendance cell). Whether the edit creates, updates or deletes the row is
/// decided by [`resolve_intent`].
#[derive(Debug, Clone, PartialEq)]
pub struct RowEdit {
    pub entity_type: EntityType,
    pub key: Snapshot,
    pub field: String,
    pub value: FieldValue,
    pub lock_scope: Option<LockScope>,
}

impl RowEdit {
    pub fn new(
        entity_type: EntityType,
        key: Snapshot,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Self {
        Self {
            entity_type,
            key,
            field: field.into(),
            value: value.into(),
            lock_scope: None,
        }
    }

    pub fn scoped(mut self, scope: LockScope) -> Self {
        self.lock_scope = Some(scope);
        self
    }
}

/// What a field edit amounts to once blank-as-delete is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedIntent {
    Create,
    Update,
    Delete,
    Noop,
}

/// Classify an edit from the stored value (`None` = no row) and the new value
///
/// Blank means "remove the row", never "store an empty value". Clearing a
/// field that is already blank (or was never set) changes nothing.
pub fn resolve_intent(old_value: Option<&FieldValue>, new_value: &FieldValue) -> ResolvedIntent {
    match old_value {
        None if new_value.is_blank() => ResolvedIntent::Noop,
        None => ResolvedIntent::Create,
        Some(old) if old.is_blank() && new_value.is_blank() => ResolvedIntent::Noop,
        Some(_) if new_value.is_blank() => ResolvedIntent::Delete,
        Some(old) if old == new_value => ResolvedIntent::Noop,
        Some(_) => ResolvedIntent::Update,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::model::ConsumerKind;

    #[test]
    fn test_resolve_intent_table() {
        let present = FieldValue::from("Present");
        let absent_mark = FieldValue::from("Absent");
        let blank = FieldValue::from("  ");

        assert_eq!(resolve_intent(None, &blank), ResolvedIntent::Noop);
        assert_eq!(resolve_intent(None, &FieldValue::Null), ResolvedIntent::Noop);
        assert_eq!(resolve_intent(None, &present), ResolvedIntent::Create);
        assert_eq!(resolve_intent(Some(&present), &blank), ResolvedIntent::Delete);
        assert_eq!(resolve_intent(Some(&FieldValue::Null), &blank), ResolvedIntent::Noop);
        assert_eq!(resolve_intent(Some(&present), &present), ResolvedIntent::Noop);
        assert_eq!(resolve_intent(Some(&present), &absent_mark), ResolvedIntent::Update);
    }

    #[test]
    fn test_scoped_sets_lock_scope() {
        let scope = LockScope::new(
            NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            ConsumerKind::student_roster(),
        );
        let intent = MutationIntent::delete(EntityType::Attendance, EntityId(4)).scoped(scope.clone());
        assert_eq!(intent.lock_scope(), Some(&scope));
    }
}
