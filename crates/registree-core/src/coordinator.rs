//! Command coordinator
//!
//! The single entry point for mutations. Every intent runs the same pipeline:
//!
//! 1. lock check (date-scoped intents only)
//! 2. capture the row's `before` state
//! 3. persist
//! 4. append one audit record
//! 5. push one undoable change-log entry
//!
//! A failure at any step stops the pipeline. Nothing is audited or pushed
//! for a write that did not persist, and a write whose audit append failed
//! is reverted before the error is returned.
//!
//! ## Logging Ownership
//!
//! Public operations log `start`/`end`/`end_error` through the `log_op_*`
//! macros. Helpers below them only use `tracing::debug!`/`warn!`.

use std::time::Instant;

use chrono::NaiveDate;
use registree_core_types::RequestContext;

use crate::audit_trail::AuditTrail;
use crate::changelog::{ChangeLog, ChangeSet, ChangeStep, StepExecutor};
use crate::commands::{resolve_intent, MutationIntent, ResolvedIntent, RowEdit};
use crate::errors::{ExError, RegisTreeError, Result};
use crate::model::{
    AuditAction, AuditId, AuditLogRecord, BatchReport, ConsumerKind, EntityId, EntityType,
    FieldValue, LockReason, LockScope, Snapshot,
};
use crate::ops::RecordStore;
use crate::policy::LockPolicyEngine;
use crate::{log_op_end, log_op_error, log_op_start};

/// Result of one executed mutation
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub entity_id: EntityId,
    pub audit_id: AuditId,
    pub action: AuditAction,
}

/// Owns the record store, audit trail, lock engine and change log
///
/// Mutating operations take `&mut self`, so one intent always runs to
/// completion before the next starts.
pub struct CommandCoordinator<S: RecordStore> {
    store: S,
    audit: AuditTrail,
    locks: LockPolicyEngine,
    changelog: ChangeLog,
}

impl<S: RecordStore> CommandCoordinator<S> {
    pub fn new(store: S, audit: AuditTrail, locks: LockPolicyEngine) -> Self {
        Self {
            store,
            audit,
            locks,
            changelog: ChangeLog::new(),
        }
    }

    /// Execute one intent and record it as one undoable entry
    ///
    /// # Errors
    ///
    /// - `LockViolation` when the intent's date is locked for its consumer
    /// - `RecordNotFound` / `RecordAlreadyExists` from the store
    /// - `InvalidIntent` for a create with no fields
    /// - `Persistence` when the store or ledger fails
    pub fn execute(&mut self, ctx: &RequestContext, intent: MutationIntent) -> Result<MutationOutcome> {
        let entity_type = intent.entity_type();
        log_op_start!(
            "execute",
            request_id = ctx.request_id.as_str(),
            entity_type = entity_type.as_str()
        );
        let start = Instant::now();

        let outcome = self.execute_impl(ctx, intent).map_err(|e| {
            log_op_error!(
                "execute",
                failure(ctx, &e),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "execute",
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = ctx.request_id.as_str(),
            entity_type = entity_type.as_str(),
            entity_id = outcome.entity_id.0,
            action = outcome.action.as_str()
        );
        Ok(outcome)
    }

    fn execute_impl(&mut self, ctx: &RequestContext, intent: MutationIntent) -> Result<MutationOutcome> {
        let (step, outcome) = self.perform(ctx, &intent)?;
        let description = describe(&step, outcome.action);
        self.changelog
            .push(ChangeSet::single(step.inverse()), ChangeSet::single(step), description);
        Ok(outcome)
    }

    /// Execute several intents as one undoable gesture
    ///
    /// Each row gets its own audit record. Failures do not roll back rows
    /// already written; the successful rows form one change-log entry.
    pub fn execute_many(
        &mut self,
        ctx: &RequestContext,
        intents: Vec<MutationIntent>,
        description: impl Into<String>,
    ) -> BatchReport<usize> {
        log_op_start!(
            "execute_many",
            request_id = ctx.request_id.as_str(),
            count = intents.len() as u64
        );
        let start = Instant::now();

        let (set, report) = self.perform_all(ctx, intents);
        if !set.is_empty() {
            self.push_entry(set, description);
        }

        log_op_end!(
            "execute_many",
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = ctx.request_id.as_str(),
            succeeded = report.succeeded_count() as u64,
            failed = report.failed_count() as u64
        );
        report
    }

    pub(crate) fn push_entry(&mut self, redo: ChangeSet, description: impl Into<String>) {
        self.changelog.push(redo.inverse(), redo, description);
    }

    pub(crate) fn perform_all(
        &mut self,
        ctx: &RequestContext,
        intents: Vec<MutationIntent>,
    ) -> (ChangeSet, BatchReport<usize>) {
        let mut set = ChangeSet::new();
        let mut report = BatchReport::new();
        for (idx, intent) in intents.into_iter().enumerate() {
            match self.perform(ctx, &intent) {
                Ok((step, _)) => {
                    set.push(step);
                    report.record_success(idx);
                }
                Err(err) => {
                    tracing::debug!(index = idx as u64, error = %err, "batch row failed");
                    report.record_failure(idx, err);
                }
            }
        }
        (set, report)
    }

    /// Apply a single-field edit with blank-as-delete semantics
    ///
    /// The row is found by matching every field of `edit.key`. Returns
    /// `Ok(None)` when the edit changes nothing.
    ///
    /// # Errors
    ///
    /// `InvalidIntent` when the key matches more than one row, plus any
    /// error from [`execute`](Self::execute).
    pub fn apply_row_edit(
        &mut self,
        ctx: &RequestContext,
        edit: RowEdit,
    ) -> Result<Option<MutationOutcome>> {
        let RowEdit {
            entity_type,
            key,
            field,
            value,
            lock_scope,
        } = edit;

        let mut matches = self
            .store
            .query(entity_type, &|r| r.fields.contains_all(&key))?;
        if matches.len() > 1 {
            return Err(RegisTreeError::InvalidIntent {
                reason: format!("key matches {} {} rows", matches.len(), entity_type),
            });
        }
        let existing = matches.pop();
        // A field the row never held reads as blank
        let old_value = existing
            .as_ref()
            .map(|r| r.fields.get(&field).cloned().unwrap_or(FieldValue::Null));

        let resolved = resolve_intent(old_value.as_ref(), &value);
        let intent = match (resolved, existing) {
            (ResolvedIntent::Noop, _) => return Ok(None),
            (ResolvedIntent::Create, _) => MutationIntent::Create {
                entity_type,
                id: None,
                values: key.with(field, value),
                lock_scope,
            },
            (ResolvedIntent::Update, Some(record)) => MutationIntent::Update {
                entity_type,
                id: record.id,
                values: Snapshot::new().with(field, value),
                lock_scope,
            },
            (ResolvedIntent::Delete, Some(record)) => MutationIntent::Delete {
                entity_type,
                id: record.id,
                lock_scope,
            },
            (resolved, None) => {
                return Err(RegisTreeError::Internal {
                    message: format!("{:?} resolved for a missing row", resolved),
                })
            }
        };
        self.execute(ctx, intent).map(Some)
    }

    /// Revert the most recent entry; `Ok(false)` when there is none
    ///
    /// # Errors
    ///
    /// `StaleReference` when a target row was removed or recreated since the
    /// entry was recorded, `LockViolation` when its date is now locked. The
    /// entry stays on its stack in both cases.
    pub fn undo(&mut self, ctx: &RequestContext) -> Result<bool> {
        self.replay(ctx, "undo", |log, exec| log.undo(exec))
    }

    /// Reapply the most recently undone entry; `Ok(false)` when there is none
    pub fn redo(&mut self, ctx: &RequestContext) -> Result<bool> {
        self.replay(ctx, "redo", |log, exec| log.redo(exec))
    }

    fn replay<F>(&mut self, ctx: &RequestContext, op: &'static str, run: F) -> Result<bool>
    where
        F: FnOnce(&mut ChangeLog, &mut dyn StepExecutor) -> Result<bool>,
    {
        log_op_start!(op, request_id = ctx.request_id.as_str());
        let start = Instant::now();

        let (result, calendar_touched) = {
            let Self {
                store,
                audit,
                locks,
                changelog,
            } = &mut *self;
            let mut executor = ReplayExecutor {
                store,
                audit,
                locks: &*locks,
                actor: &ctx.actor,
                calendar_touched: false,
            };
            let result = run(changelog, &mut executor);
            (result, executor.calendar_touched)
        };
        // A failed replay may still have applied earlier steps
        if calendar_touched {
            self.sync_calendar();
        }

        let ran = result.map_err(|e| {
            log_op_error!(
                op,
                failure(ctx, &e),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            op,
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = ctx.request_id.as_str(),
            ran = ran
        );
        Ok(ran)
    }

    pub fn can_undo(&self) -> bool {
        self.changelog.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.changelog.can_redo()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.changelog.undo_description()
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.changelog.redo_description()
    }

    /// Audit records for one row, oldest first
    pub fn history(&self, entity_type: EntityType, entity_id: EntityId) -> Result<Vec<AuditLogRecord>> {
        self.audit.history(entity_type, entity_id)
    }

    pub fn is_locked(&self, date: NaiveDate, consumer: &ConsumerKind) -> Option<LockReason> {
        self.locks.is_locked(date, consumer)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn changelog(&self) -> &ChangeLog {
        &self.changelog
    }

    pub fn locks(&self) -> &LockPolicyEngine {
        &self.locks
    }

    /// Calendar or exception changes apply to the next lock check
    pub fn locks_mut(&mut self) -> &mut LockPolicyEngine {
        &mut self.locks
    }

    /// Persist and audit one intent without touching the change log
    fn perform(
        &mut self,
        ctx: &RequestContext,
        intent: &MutationIntent,
    ) -> Result<(ChangeStep, MutationOutcome)> {
        check_lock(&self.locks, intent.lock_scope())?;

        let (entity_type, entity_id, before) = match intent {
            MutationIntent::Create {
                entity_type,
                id,
                values,
                ..
            } => {
                if values.is_empty() {
                    return Err(RegisTreeError::InvalidIntent {
                        reason: format!("create of {} has no fields", entity_type),
                    });
                }
                let new_id = self.store.add(*entity_type, *id, values.clone())?;
                (*entity_type, new_id, None)
            }
            MutationIntent::Update {
                entity_type,
                id,
                values,
                ..
            } => {
                let before = require(&self.store, *entity_type, *id)?;
                self.store
                    .update(*entity_type, *id, before.merged(values))?;
                (*entity_type, *id, Some(before))
            }
            MutationIntent::Delete {
                entity_type, id, ..
            } => {
                let before = require(&self.store, *entity_type, *id)?;
                self.store.delete(*entity_type, *id)?;
                (*entity_type, *id, Some(before))
            }
        };

        let after = read_snapshot(&self.store, entity_type, entity_id)?;
        let (action, audit_id) = audit_or_revert(
            &mut self.store,
            &mut self.audit,
            &ctx.actor,
            entity_type,
            entity_id,
            before.clone(),
            after.clone(),
        )?;
        if entity_type.feeds_calendar() {
            self.sync_calendar();
        }

        let step = ChangeStep {
            entity_type,
            entity_id,
            from: before,
            to: after,
            lock_scope: intent.lock_scope().cloned(),
        };
        let outcome = MutationOutcome {
            entity_id,
            audit_id,
            action,
        };
        Ok((step, outcome))
    }
}

impl<S: RecordStore> std::fmt::Debug for CommandCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandCoordinator")
            .field("changelog", &self.changelog)
            .finish_non_exhaustive()
    }
}

/// Replays change steps for undo/redo
///
/// Holds disjoint borrows of the coordinator's parts; the change log itself
/// is out of reach, so replay cannot push.
struct ReplayExecutor<'a, S: RecordStore> {
    store: &'a mut S,
    audit: &'a mut AuditTrail,
    locks: &'a LockPolicyEngine,
    actor: &'a str,
    calendar_touched: bool,
}

impl<S: RecordStore> StepExecutor for ReplayExecutor<'_, S> {
    fn check(&self, step: &ChangeStep) -> Result<()> {
        check_lock(self.locks, step.lock_scope.as_ref())?;

        let current = self.store.get(step.entity_type, step.entity_id)?;
        let reason = match (&step.from, current) {
            (Some(_), None) => "no longer exists",
            (None, Some(_)) => "already exists",
            _ => return Ok(()),
        };
        Err(RegisTreeError::StaleReference {
            entity_type: step.entity_type,
            entity_id: step.entity_id,
            reason: reason.to_string(),
        })
    }

    fn execute(&mut self, step: &ChangeStep) -> Result<()> {
        let before = read_snapshot(&*self.store, step.entity_type, step.entity_id)?;
        apply_state(&mut *self.store, step.entity_type, step.entity_id, step.to.as_ref())?;
        let after = read_snapshot(&*self.store, step.entity_type, step.entity_id)?;
        audit_or_revert(
            &mut *self.store,
            &mut *self.audit,
            self.actor,
            step.entity_type,
            step.entity_id,
            before,
            after,
        )?;
        self.calendar_touched |= step.entity_type.feeds_calendar();
        Ok(())
    }
}

/// Structured form of a failed operation, tagged with the caller's ids
pub(crate) fn failure(ctx: &RequestContext, err: &RegisTreeError) -> ExError {
    let ex = ExError::from(err.clone()).with_request_id(ctx.request_id.clone());
    match &ctx.trace_id {
        Some(trace_id) => ex.with_trace_id(trace_id.clone()),
        None => ex,
    }
}

fn check_lock(locks: &LockPolicyEngine, scope: Option<&LockScope>) -> Result<()> {
    let Some(scope) = scope else {
        return Ok(());
    };
    match locks.is_locked(scope.date, &scope.consumer) {
        Some(reason) => Err(RegisTreeError::LockViolation {
            date: scope.date,
            kind: reason.kind,
            label: reason.label,
        }),
        None => Ok(()),
    }
}

fn read_snapshot<S: RecordStore + ?Sized>(
    store: &S,
    entity_type: EntityType,
    entity_id: EntityId,
) -> Result<Option<Snapshot>> {
    Ok(store
        .get(entity_type, entity_id)?
        .map(|record| store.snapshot(&record)))
}

fn require<S: RecordStore + ?Sized>(
    store: &S,
    entity_type: EntityType,
    entity_id: EntityId,
) -> Result<Snapshot> {
    read_snapshot(store, entity_type, entity_id)?.ok_or(RegisTreeError::RecordNotFound {
        entity_type,
        entity_id,
    })
}

/// Bring one row to `target` (`None` = absent), whatever its current state
fn apply_state<S: RecordStore + ?Sized>(
    store: &mut S,
    entity_type: EntityType,
    entity_id: EntityId,
    target: Option<&Snapshot>,
) -> Result<()> {
    let exists = store.get(entity_type, entity_id)?.is_some();
    match (target, exists) {
        (Some(values), true) => store.update(entity_type, entity_id, values.clone()),
        (Some(values), false) => store
            .add(entity_type, Some(entity_id), values.clone())
            .map(|_| ()),
        (None, true) => store.delete(entity_type, entity_id),
        (None, false) => Ok(()),
    }
}

/// Append the audit record for a write that already persisted
///
/// If the append fails the write is reverted so the store never holds an
/// unaudited change.
fn audit_or_revert<S: RecordStore + ?Sized>(
    store: &mut S,
    audit: &mut AuditTrail,
    actor: &str,
    entity_type: EntityType,
    entity_id: EntityId,
    before: Option<Snapshot>,
    after: Option<Snapshot>,
) -> Result<(AuditAction, AuditId)> {
    let action = AuditAction::from_shape(before.is_some(), after.is_some()).ok_or_else(|| {
        RegisTreeError::Internal {
            message: format!("{} {} absent before and after write", entity_type, entity_id),
        }
    })?;

    match audit.record(actor, action, entity_type, entity_id, before.clone(), after) {
        Ok(audit_id) => Ok((action, audit_id)),
        Err(err) => {
            if let Err(revert_err) = apply_state(store, entity_type, entity_id, before.as_ref()) {
                tracing::warn!(
                    entity_type = entity_type.as_str(),
                    entity_id = entity_id.0,
                    error = %revert_err,
                    "failed to revert unaudited write"
                );
            }
            Err(err)
        }
    }
}

fn describe(step: &ChangeStep, action: AuditAction) -> String {
    let verb = match action {
        AuditAction::Create => "Create",
        AuditAction::Update => "Update",
        AuditAction::Delete => "Delete",
    };
    format!("{} {} {}", verb, step.entity_type, step.entity_id)
}
