//! Undo/redo history
//!
//! Entries are pairs of [`ChangeSet`]s: plain data describing which rows move
//! from which state to which. A [`StepExecutor`] interprets them; it has no
//! access to the [`ChangeLog`], so replaying history can never push new
//! history.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::model::{AuditAction, EntityId, EntityType, LockScope, Snapshot};

/// Move one row from state `from` to state `to` (`None` = absent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeStep {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub from: Option<Snapshot>,
    pub to: Option<Snapshot>,
    pub lock_scope: Option<LockScope>,
}

impl ChangeStep {
    /// The step that undoes this one
    pub fn inverse(&self) -> ChangeStep {
        ChangeStep {
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            from: self.to.clone(),
            to: self.from.clone(),
            lock_scope: self.lock_scope.clone(),
        }
    }

    /// Audit action this step performs, `None` for an absent-to-absent no-op
    pub fn action(&self) -> Option<AuditAction> {
        AuditAction::from_shape(self.from.is_some(), self.to.is_some())
    }
}

/// Ordered steps applied as one user gesture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet(Vec<ChangeStep>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(step: ChangeStep) -> Self {
        Self(vec![step])
    }

    /// Append a step
    ///
    /// A row touched twice collapses into one step from its first state to
    /// its last, so replay never has to check a row against an intermediate
    /// state. A row created and then deleted drops out entirely.
    pub fn push(&mut self, step: ChangeStep) {
        let existing = self
            .0
            .iter()
            .position(|s| s.entity_type == step.entity_type && s.entity_id == step.entity_id);
        match existing {
            Some(idx) => {
                self.0[idx].to = step.to;
                if self.0[idx].from.is_none() && self.0[idx].to.is_none() {
                    self.0.remove(idx);
                }
            }
            None => self.0.push(step),
        }
    }

    /// Reversed order with every step inverted
    pub fn inverse(&self) -> ChangeSet {
        Self(self.0.iter().rev().map(ChangeStep::inverse).collect())
    }

    pub fn steps(&self) -> &[ChangeStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ChangeStep>> for ChangeSet {
    fn from(steps: Vec<ChangeStep>) -> Self {
        Self(steps)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeLogEntry {
    pub undo: ChangeSet,
    pub redo: ChangeSet,
    pub description: String,
}

/// Interprets change steps against live state
pub trait StepExecutor {
    /// Verify a step can run without touching state
    fn check(&self, step: &ChangeStep) -> Result<()>;

    fn execute(&mut self, step: &ChangeStep) -> Result<()>;
}

/// Two-stack undo/redo history
#[derive(Debug, Default)]
pub struct ChangeLog {
    undo_stack: Vec<ChangeLogEntry>,
    redo_stack: Vec<ChangeLogEntry>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed gesture; discards any redo branch
    pub fn push(&mut self, undo: ChangeSet, redo: ChangeSet, description: impl Into<String>) {
        self.undo_stack.push(ChangeLogEntry {
            undo,
            redo,
            description: description.into(),
        });
        self.redo_stack.clear();
    }

    /// Revert the most recent entry
    ///
    /// Returns `Ok(false)` when there is nothing to undo. Every step is
    /// checked before any runs; the entry moves to the redo stack only once
    /// all steps succeeded, so a failure leaves both stacks as they were.
    pub fn undo(&mut self, executor: &mut dyn StepExecutor) -> Result<bool> {
        let Some(entry) = self.undo_stack.last() else {
            return Ok(false);
        };
        run(&entry.undo, executor)?;
        if let Some(entry) = self.undo_stack.pop() {
            self.redo_stack.push(entry);
        }
        Ok(true)
    }

    /// Reapply the most recently undone entry
    pub fn redo(&mut self, executor: &mut dyn StepExecutor) -> Result<bool> {
        let Some(entry) = self.redo_stack.last() else {
            return Ok(false);
        };
        run(&entry.redo, executor)?;
        if let Some(entry) = self.redo_stack.pop() {
            self.undo_stack.push(entry);
        }
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|e| e.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.description.as_str())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }
}

fn run(set: &ChangeSet, executor: &mut dyn StepExecutor) -> Result<()> {
    for step in set.steps() {
        executor.check(step)?;
    }
    for step in set.steps() {
        executor.execute(step)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RegisTreeError;

    #[derive(Default)]
    struct Recorder {
        executed: Vec<ChangeStep>,
        fail_check: bool,
    }

    impl StepExecutor for Recorder {
        fn check(&self, step: &ChangeStep) -> Result<()> {
            if self.fail_check {
                return Err(RegisTreeError::StaleReference {
                    entity_type: step.entity_type,
                    entity_id: step.entity_id,
                    reason: "no longer exists".to_string(),
                });
            }
            Ok(())
        }

        fn execute(&mut self, step: &ChangeStep) -> Result<()> {
            self.executed.push(step.clone());
            Ok(())
        }
    }

    fn create_step(id: i64) -> ChangeStep {
        ChangeStep {
            entity_type: EntityType::Class,
            entity_id: EntityId(id),
            from: None,
            to: Some(Snapshot::new().with("name", "A")),
            lock_scope: None,
        }
    }

    fn push_create(log: &mut ChangeLog, id: i64) {
        let redo = ChangeSet::single(create_step(id));
        log.push(redo.inverse(), redo, format!("Create Class {}", id));
    }

    #[test]
    fn test_inverse_reverses_and_swaps() {
        let set = ChangeSet::from(vec![create_step(1), create_step(2)]);
        let inv = set.inverse();
        assert_eq!(inv.steps()[0].entity_id, EntityId(2));
        assert_eq!(inv.steps()[0].action(), Some(AuditAction::Delete));
        assert_eq!(inv.inverse(), set);
    }

    #[test]
    fn test_push_coalesces_same_row() {
        let mut set = ChangeSet::new();
        set.push(create_step(1));
        set.push(ChangeStep {
            from: Some(Snapshot::new().with("name", "A")),
            to: Some(Snapshot::new().with("name", "B")),
            ..create_step(1)
        });
        assert_eq!(set.len(), 1);
        assert_eq!(set.steps()[0].from, None);
        assert_eq!(set.steps()[0].to, Some(Snapshot::new().with("name", "B")));

        set.push(ChangeStep {
            from: Some(Snapshot::new().with("name", "B")),
            to: None,
            ..create_step(1)
        });
        assert!(set.is_empty());
    }

    #[test]
    fn test_empty_stacks_return_false() {
        let mut log = ChangeLog::new();
        let mut exec = Recorder::default();
        assert!(!log.undo(&mut exec).unwrap());
        assert!(!log.redo(&mut exec).unwrap());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut log = ChangeLog::new();
        let mut exec = Recorder::default();
        push_create(&mut log, 1);
        assert!(log.undo(&mut exec).unwrap());
        assert!(log.can_redo());

        push_create(&mut log, 2);
        assert!(!log.can_redo());
        assert!(!log.redo(&mut exec).unwrap());
    }

    #[test]
    fn test_failed_undo_keeps_stacks() {
        let mut log = ChangeLog::new();
        push_create(&mut log, 1);
        let mut exec = Recorder {
            fail_check: true,
            ..Recorder::default()
        };
        assert!(log.undo(&mut exec).is_err());
        assert_eq!(log.undo_len(), 1);
        assert_eq!(log.redo_len(), 0);
        assert!(exec.executed.is_empty());
    }

    #[test]
    fn test_descriptions_follow_stacks() {
        let mut log = ChangeLog::new();
        let mut exec = Recorder::default();
        push_create(&mut log, 1);
        assert_eq!(log.undo_description(), Some("Create Class 1"));
        log.undo(&mut exec).unwrap();
        assert_eq!(log.undo_description(), None);
        assert_eq!(log.redo_description(), Some("Create Class 1"));
        log.clear();
        assert!(!log.can_redo());
    }
}
