//! Unsaved-edit tracking for grid views
//!
//! Rows collect pending field values until they are committed. With
//! auto-save on, a commit writes immediately; with it off, rows wait for an
//! explicit save-all. Nothing here touches storage directly: the caller
//! supplies the writer (normally the coordinator's row-edit path).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::Result;
use crate::model::{BatchReport, FieldValue, Snapshot};

/// Stable identifier of a grid row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirtyRow {
    pub row_id: RowId,
    pub pending_fields: Snapshot,
    pub committed: bool,
}

/// Hook for views that render dirty indicators
pub trait DirtyObserver {
    fn on_dirty(&mut self, row_id: &RowId);
    fn on_clean(&mut self, row_id: &RowId);
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl DirtyObserver for NoopObserver {
    fn on_dirty(&mut self, _row_id: &RowId) {}
    fn on_clean(&mut self, _row_id: &RowId) {}
}

/// Shared runtime auto-save toggle
///
/// Clones share one flag; changes are seen by the very next commit.
#[derive(Debug, Clone, Default)]
pub struct AutoSaveFlag(Arc<AtomicBool>);

impl AutoSaveFlag {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Written; carries the row as it was committed
    Committed(DirtyRow),
    /// Auto-save is off; the row stays dirty
    Deferred,
    NotDirty,
}

pub struct DirtyStateTracker {
    rows: BTreeMap<RowId, DirtyRow>,
    auto_save: AutoSaveFlag,
    observer: Box<dyn DirtyObserver>,
}

impl DirtyStateTracker {
    pub fn new(auto_save: AutoSaveFlag) -> Self {
        Self::with_observer(auto_save, Box::new(NoopObserver))
    }

    pub fn with_observer(auto_save: AutoSaveFlag, observer: Box<dyn DirtyObserver>) -> Self {
        Self {
            rows: BTreeMap::new(),
            auto_save,
            observer,
        }
    }

    pub fn auto_save(&self) -> &AutoSaveFlag {
        &self.auto_save
    }

    /// Add a row to the open set and notify the observer
    pub fn mark_dirty(&mut self, row_id: RowId) {
        self.observer.on_dirty(&row_id);
        self.rows.entry(row_id.clone()).or_insert_with(|| DirtyRow {
            row_id,
            pending_fields: Snapshot::new(),
            committed: false,
        });
    }

    /// Record a pending field value and mark the row dirty
    pub fn stage(&mut self, row_id: RowId, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.mark_dirty(row_id.clone());
        if let Some(row) = self.rows.get_mut(&row_id) {
            row.pending_fields.insert(field, value);
        }
    }

    /// Write a row now if auto-save is on
    ///
    /// # Errors
    ///
    /// Propagates the writer's error; the row stays dirty.
    pub fn commit_row<F>(&mut self, row_id: &RowId, writer: F) -> Result<CommitOutcome>
    where
        F: FnOnce(&DirtyRow) -> Result<()>,
    {
        let Some(row) = self.rows.get(row_id) else {
            return Ok(CommitOutcome::NotDirty);
        };
        if !self.auto_save.enabled() {
            return Ok(CommitOutcome::Deferred);
        }
        writer(row)?;
        Ok(CommitOutcome::Committed(self.finish(row_id)))
    }

    /// Write every dirty row in row-id order
    ///
    /// Not atomic: rows written before a failure stay written, and failed
    /// rows stay dirty for a later attempt.
    pub fn save_all<F>(&mut self, mut writer: F) -> BatchReport<RowId>
    where
        F: FnMut(&DirtyRow) -> Result<()>,
    {
        let mut report = BatchReport::new();
        let ids: Vec<RowId> = self.rows.keys().cloned().collect();
        for row_id in ids {
            let outcome = match self.rows.get(&row_id) {
                Some(row) => writer(row),
                None => continue,
            };
            match outcome {
                Ok(()) => {
                    self.finish(&row_id);
                    report.record_success(row_id);
                }
                Err(err) => report.record_failure(row_id, err),
            }
        }
        report
    }

    /// Drop pending edits for one row without writing
    pub fn discard(&mut self, row_id: &RowId) -> bool {
        let removed = self.rows.remove(row_id).is_some();
        if removed {
            self.observer.on_clean(row_id);
        }
        removed
    }

    pub fn discard_all(&mut self) {
        let rows = std::mem::take(&mut self.rows);
        for row_id in rows.keys() {
            self.observer.on_clean(row_id);
        }
    }

    pub fn is_dirty(&self, row_id: &RowId) -> bool {
        self.rows.contains_key(row_id)
    }

    /// Dirty row ids in order
    pub fn dirty_rows(&self) -> Vec<RowId> {
        self.rows.keys().cloned().collect()
    }

    pub fn pending(&self, row_id: &RowId) -> Option<&Snapshot> {
        self.rows.get(row_id).map(|row| &row.pending_fields)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn finish(&mut self, row_id: &RowId) -> DirtyRow {
        self.observer.on_clean(row_id);
        let mut row = self.rows.remove(row_id).unwrap_or_else(|| DirtyRow {
            row_id: row_id.clone(),
            pending_fields: Snapshot::new(),
            committed: false,
        });
        row.committed = true;
        row
    }
}

impl fmt::Debug for DirtyStateTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirtyStateTracker")
            .field("rows", &self.rows)
            .field("auto_save", &self.auto_save.enabled())
            .finish_non_exhaustive()
    }
}
