//! Grid edits: blank-as-delete and the dirty tracker
//!
//! ## Scenarios Covered
//!
//! 1. Clearing a stored cell deletes the row with exactly one delete record
//! 2. Typing into an empty cell creates the row from its key
//! 3. Re-entering the stored value, or clearing a field never set, is a no-op
//! 4. The auto-save toggle applies to the very next commit
//! 5. Save-all keeps earlier rows committed and failed rows dirty

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{coordinator, coordinator_with_rules, d, rows};
use registree_core::{
    AuditAction, AutoSaveFlag, CommitOutcome, ConsumerKind, DirtyRow, DirtyStateTracker,
    EntityType, FieldValue, LockKind, LockRule, LockScope, MemoryStore, RecordStore, RowEdit,
    RowId, Snapshot, CommandCoordinator, RequestContext, Result,
};

fn cell_key(student: i64, day: chrono::NaiveDate) -> Snapshot {
    Snapshot::new()
        .with("student_id", student)
        .with("class_id", 1_i64)
        .with("date", day)
}

fn mark(student: i64, day: chrono::NaiveDate, status: &str) -> RowEdit {
    RowEdit::new(EntityType::Attendance, cell_key(student, day), "status", status)
        .scoped(LockScope::new(day, ConsumerKind::student_roster()))
}

/// Writer that commits a dirty row's pending fields for one student
fn write_row(
    coord: &mut CommandCoordinator<MemoryStore>,
    ctx: &RequestContext,
    day: chrono::NaiveDate,
    row: &DirtyRow,
) -> Result<()> {
    let student: i64 = row.row_id.as_str().trim_start_matches("student-").parse().unwrap();
    for (field, value) in row.pending_fields.iter() {
        coord.apply_row_edit(
            ctx,
            RowEdit::new(EntityType::Attendance, cell_key(student, day), field, value.clone())
                .scoped(LockScope::new(day, ConsumerKind::student_roster())),
        )?;
    }
    Ok(())
}

#[test]
fn test_clearing_cell_deletes_row() {
    // GIVEN a stored "Present" mark
    let day = d(2025, 2, 3);
    let mut coord = coordinator();
    let ctx = RequestContext::new("ana");
    let created = coord.apply_row_edit(&ctx, mark(7, day, "Present")).unwrap().unwrap();
    let stored = coord.store().get(EntityType::Attendance, created.entity_id).unwrap().unwrap();

    // WHEN the cell is cleared
    let outcome = coord.apply_row_edit(&ctx, mark(7, day, "   ")).unwrap().unwrap();

    // THEN the row is removed
    assert_eq!(outcome.action, AuditAction::Delete);
    assert!(rows(&coord, EntityType::Attendance).is_empty());

    // AND exactly one delete record holds the prior snapshot
    let deletes: Vec<_> = coord
        .audit()
        .records()
        .unwrap()
        .into_iter()
        .filter(|r| r.action == AuditAction::Delete)
        .collect();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].before.as_ref(), Some(&stored.fields));
    assert!(deletes[0].after.is_none());
}

#[test]
fn test_typing_into_empty_cell_creates_row() {
    let day = d(2025, 2, 3);
    let mut coord = coordinator();
    let ctx = RequestContext::new("ana");

    let outcome = coord.apply_row_edit(&ctx, mark(7, day, "Late")).unwrap().unwrap();

    assert_eq!(outcome.action, AuditAction::Create);
    let row = coord.store().get(EntityType::Attendance, outcome.entity_id).unwrap().unwrap();
    assert_eq!(row.fields.get("status"), Some(&FieldValue::from("Late")));
    assert_eq!(row.fields.get("date"), Some(&FieldValue::Date(day)));
}

#[test]
fn test_unchanged_and_blank_edits_are_noops() {
    let day = d(2025, 2, 3);
    let mut coord = coordinator();
    let ctx = RequestContext::new("ana");

    // Blank on a missing row does nothing
    assert!(coord.apply_row_edit(&ctx, mark(7, day, "")).unwrap().is_none());

    // Same value twice writes once
    coord.apply_row_edit(&ctx, mark(7, day, "Present")).unwrap();
    assert!(coord.apply_row_edit(&ctx, mark(7, day, "Present")).unwrap().is_none());
    assert_eq!(coord.audit().len().unwrap(), 1);
}

#[test]
fn test_clearing_unset_field_keeps_row() {
    // GIVEN a mark with a status but no note
    let day = d(2025, 2, 3);
    let mut coord = coordinator();
    let ctx = RequestContext::new("ana");
    let created = coord.apply_row_edit(&ctx, mark(7, day, "Present")).unwrap().unwrap();

    // WHEN the empty note cell is cleared
    let outcome = coord
        .apply_row_edit(
            &ctx,
            RowEdit::new(EntityType::Attendance, cell_key(7, day), "note", ""),
        )
        .unwrap();

    // THEN nothing is written and the row survives
    assert!(outcome.is_none());
    assert!(coord.store().get(EntityType::Attendance, created.entity_id).unwrap().is_some());
    assert_eq!(coord.audit().len().unwrap(), 1);
}

#[test]
fn test_auto_save_toggle_applies_to_next_commit() {
    // GIVEN auto-save off and a staged mark
    let day = d(2025, 2, 3);
    let flag = AutoSaveFlag::new(false);
    let mut tracker = DirtyStateTracker::new(flag.clone());
    let mut coord = coordinator();
    let ctx = RequestContext::new("ana");
    let row_id = RowId::new("student-7");
    tracker.stage(row_id.clone(), "status", "Absent");

    // WHEN committing with auto-save off
    let first = tracker
        .commit_row(&row_id, |row| write_row(&mut coord, &ctx, day, row))
        .unwrap();

    // THEN nothing is written
    assert_eq!(first, CommitOutcome::Deferred);
    assert!(rows(&coord, EntityType::Attendance).is_empty());

    // WHEN the toggle flips through another handle and the row commits again
    flag.set(true);
    let second = tracker
        .commit_row(&row_id, |row| write_row(&mut coord, &ctx, day, row))
        .unwrap();

    // THEN the row is written and clean
    match second {
        CommitOutcome::Committed(row) => assert!(row.committed),
        other => panic!("expected Committed, got {:?}", other),
    }
    assert!(!tracker.is_dirty(&row_id));
    assert_eq!(rows(&coord, EntityType::Attendance).len(), 1);
}

#[test]
fn test_save_all_partial_failure_keeps_failed_rows_dirty() {
    // GIVEN three staged rows, one of them on a locked day
    let open_day = d(2025, 2, 3);
    let locked_day = d(2025, 2, 4);
    let mut coord = coordinator_with_rules(vec![LockRule::on(locked_day, LockKind::NoSchool, "Storm")]);
    let ctx = RequestContext::new("ana");
    let mut tracker = DirtyStateTracker::new(AutoSaveFlag::new(false));
    for student in [1, 2, 3] {
        tracker.stage(RowId::new(format!("student-{}", student)), "status", "Present");
    }

    // WHEN saving all, with student 2 dated on the locked day
    let report = tracker.save_all(|row| {
        let day = if row.row_id.as_str() == "student-2" { locked_day } else { open_day };
        write_row(&mut coord, &ctx, day, row)
    });

    // THEN rows 1 and 3 are saved and row 2 stays dirty
    assert_eq!(report.succeeded_count(), 2);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.failed[0].0, RowId::new("student-2"));
    assert_eq!(tracker.dirty_rows(), vec![RowId::new("student-2")]);
    assert_eq!(rows(&coord, EntityType::Attendance).len(), 2);
    assert_eq!(
        tracker.pending(&RowId::new("student-2")).unwrap().get("status"),
        Some(&FieldValue::from("Present"))
    );
}
