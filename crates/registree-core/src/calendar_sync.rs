//! Calendar events as lock rules, and their effect on attendance
//!
//! Creating a "No School" or "Teachers Only" event marks every enrolled
//! student "No School" for each day of the event. The whole sweep is one
//! undoable entry with one audit record per attendance row.

use std::time::Instant;

use chrono::Utc;
use registree_core_types::{RequestContext, SYSTEM_ACTOR};

use crate::commands::MutationIntent;
use crate::coordinator::{failure, CommandCoordinator, MutationOutcome};
use crate::errors::{RegisTreeError, Result};
use crate::model::{
    BatchReport, EntityType, FieldValue, LockKind, LockRule, Record, Snapshot, WeeklySchedule,
};
use crate::ops::RecordStore;
use crate::policy::StaticCalendar;
use crate::{log_op_end, log_op_error, log_op_start};

pub const NO_SCHOOL_STATUS: &str = "No School";
pub const EVENT_MARKER: &str = "System(Event)";
pub const SCHOOL_DAYS_FIELD: &str = "school_days_json";

/// Parse a stored `CalendarEvent` record into a lock rule
///
/// # Errors
///
/// `InvalidIntent` when a required field is missing or malformed, or the
/// range ends before it starts.
pub fn lock_rule_from_record(record: &Record) -> Result<LockRule> {
    let invalid = |reason: String| RegisTreeError::InvalidIntent {
        reason: format!("CalendarEvent {}: {}", record.id, reason),
    };

    let label = record
        .fields
        .get("title")
        .and_then(FieldValue::as_text)
        .map(str::to_string)
        .ok_or_else(|| invalid("missing title".to_string()))?;
    let date_field = |name: &str| {
        record
            .fields
            .get(name)
            .and_then(FieldValue::as_date)
            .ok_or_else(|| invalid(format!("missing or malformed {}", name)))
    };
    let start_date = date_field("start_date")?;
    let end_date = date_field("end_date")?;
    if end_date < start_date {
        return Err(invalid("end_date before start_date".to_string()));
    }

    let kind = match record.fields.get("event_type").and_then(FieldValue::as_text) {
        Some(text) => text.parse::<LockKind>().map_err(|e| invalid(e.to_string()))?,
        None => LockKind::Custom,
    };

    Ok(LockRule::new(start_date, end_date, kind, label))
}

/// Fields of a `CalendarEvent` record describing `rule`
pub fn record_fields_for_rule(rule: &LockRule) -> Snapshot {
    Snapshot::new()
        .with("title", rule.label.as_str())
        .with("start_date", rule.start_date)
        .with("end_date", rule.end_date)
        .with("event_type", rule.kind.as_str())
}

/// Build the lock calendar from stored events and settings
///
/// Events that fail to parse are skipped with a warning. The weekly schedule
/// comes from the first `Settings` record, falling back to Mon–Fri.
pub fn calendar_from_records<S: RecordStore + ?Sized>(store: &S) -> Result<StaticCalendar> {
    let mut rules = Vec::new();
    for record in store.query(EntityType::CalendarEvent, &|_| true)? {
        match lock_rule_from_record(&record) {
            Ok(rule) => rules.push(rule),
            Err(err) => tracing::warn!(entity_id = record.id.0, error = %err, "skipping calendar event"),
        }
    }

    let settings = store.query(EntityType::Settings, &|_| true)?;
    let raw = settings
        .first()
        .and_then(|r| r.fields.get(SCHOOL_DAYS_FIELD))
        .and_then(FieldValue::as_text);
    Ok(StaticCalendar::new(rules, WeeklySchedule::from_settings_json(raw)))
}

impl<S: RecordStore> CommandCoordinator<S> {
    /// Reload the lock calendar from the record store
    pub fn refresh_calendar(&mut self) -> Result<()> {
        let calendar = calendar_from_records(self.store())?;
        self.locks_mut().replace_calendar(Box::new(calendar));
        Ok(())
    }

    /// Refresh after a calendar or settings row changed
    ///
    /// The write has already persisted and been audited, so a failed reload
    /// is logged rather than returned.
    pub(crate) fn sync_calendar(&mut self) {
        if let Err(err) = self.refresh_calendar() {
            tracing::warn!(error = %err, "lock calendar not reloaded");
        }
    }

    /// Store a calendar event and mark attendance
    ///
    /// Produces two undo entries: the event itself, then the attendance
    /// sweep (empty for Custom events). Storing the event reloads the lock
    /// calendar, as any `CalendarEvent` or `Settings` write does.
    pub fn create_calendar_event(
        &mut self,
        ctx: &RequestContext,
        rule: &LockRule,
    ) -> Result<(MutationOutcome, BatchReport<usize>)> {
        let outcome = self.execute(
            ctx,
            MutationIntent::create(EntityType::CalendarEvent, record_fields_for_rule(rule)),
        )?;
        let report = self.propagate_no_school(ctx, rule)?;
        Ok((outcome, report))
    }

    /// Mark every enrolled student "No School" for each day of `rule`
    ///
    /// Existing attendance rows are overwritten; missing ones are created.
    /// Rows are written as the system actor and carry no lock scope, so the
    /// sweep is never blocked by the rule it applies. Custom rules mark
    /// nothing.
    ///
    /// # Errors
    ///
    /// Only a failure to read enrollments or attendance aborts the sweep;
    /// per-row failures land in the report.
    pub fn propagate_no_school(
        &mut self,
        ctx: &RequestContext,
        rule: &LockRule,
    ) -> Result<BatchReport<usize>> {
        if !rule.kind.propagates_to_attendance() {
            return Ok(BatchReport::new());
        }

        log_op_start!(
            "propagate_no_school",
            request_id = ctx.request_id.as_str(),
            lock_kind = rule.kind.as_str()
        );
        let start = Instant::now();

        let intents = self.no_school_intents(rule).map_err(|e| {
            log_op_error!(
                "propagate_no_school",
                failure(ctx, &e),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        let system = RequestContext {
            actor: SYSTEM_ACTOR.to_string(),
            ..ctx.clone()
        };
        let (set, report) = self.perform_all(&system, intents);
        if !set.is_empty() {
            self.push_entry(set, format!("Apply No School: {}", rule.label));
        }

        log_op_end!(
            "propagate_no_school",
            duration_ms = start.elapsed().as_millis() as u64,
            succeeded = report.succeeded_count() as u64,
            failed = report.failed_count() as u64
        );
        Ok(report)
    }

    /// One intent per (student, class, day), however many enrollments repeat it
    fn no_school_intents(&self, rule: &LockRule) -> Result<Vec<MutationIntent>> {
        let mut pairs: Vec<(FieldValue, FieldValue)> = Vec::new();
        for enrollment in self.store().query(EntityType::Enrollment, &|_| true)? {
            let pair = enrollment_pair(&enrollment);
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
        let stamp = FieldValue::DateTime(Utc::now().naive_utc());
        let mut intents = Vec::new();

        for date in rule.dates() {
            for (student_id, class_id) in &pairs {
                let key = Snapshot::new()
                    .with("student_id", student_id.clone())
                    .with("class_id", class_id.clone())
                    .with("date", date);
                let existing = self
                    .store()
                    .query(EntityType::Attendance, &|r| r.fields.contains_all(&key))?;
                let marks = Snapshot::new()
                    .with("status", NO_SCHOOL_STATUS)
                    .with("marked_by", EVENT_MARKER)
                    .with("timestamp", stamp.clone());

                match existing.first() {
                    Some(row) => intents.push(MutationIntent::update(EntityType::Attendance, row.id, marks)),
                    None => intents.push(MutationIntent::create(EntityType::Attendance, key.merged(&marks))),
                }
            }
        }
        Ok(intents)
    }
}

fn enrollment_pair(enrollment: &Record) -> (FieldValue, FieldValue) {
    let field = |name: &str| enrollment.fields.get(name).cloned().unwrap_or(FieldValue::Null);
    (field("student_id"), field("class_id"))
}
