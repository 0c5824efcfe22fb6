//! Operation lifecycle logging
//!
//! The capture subscriber is global to this test binary, so every assertion
//! filters on the request id of its own context.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{coordinator, coordinator_over, coordinator_with_rules, d, named, SharedStore};
use registree_core::logging_facility::test_capture::init_test_capture;
use registree_core::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use registree_core::{
    ConsumerKind, EntityType, LockKind, LockRule, LockScope, MutationIntent, RecordStore,
    RequestContext, Snapshot,
};
use registree_core_types::TraceId;

#[test]
fn test_execute_logs_start_and_end_with_request_id() {
    let capture = init_test_capture();
    let mut coord = coordinator();
    let ctx = RequestContext::new("ana");

    coord
        .execute(&ctx, MutationIntent::create(EntityType::Class, named("A")))
        .unwrap();

    let events = capture.events_for_request("execute", ctx.request_id.as_str());
    let kinds: Vec<_> = events.iter().filter_map(|e| e.event().map(str::to_string)).collect();
    assert_eq!(kinds, vec![EVENT_START.to_string(), EVENT_END.to_string()]);
    assert_eq!(events[0].field("entity_type"), Some("Class"));
    assert!(events[1].field("duration_ms").is_some());
}

#[test]
fn test_failed_execute_logs_error_code() {
    let capture = init_test_capture();
    let day = d(2025, 1, 8);
    let mut coord = coordinator_with_rules(vec![LockRule::on(day, LockKind::NoSchool, "Snow Day")]);
    let ctx = RequestContext::new("ana");

    let result = coord.execute(
        &ctx,
        MutationIntent::create(EntityType::Attendance, Snapshot::new().with("status", "Present"))
            .scoped(LockScope::new(day, ConsumerKind::student_roster())),
    );
    assert!(result.is_err());

    let events = capture.events_for_request("execute", ctx.request_id.as_str());
    let failure = events
        .iter()
        .find(|e| e.event() == Some(EVENT_END_ERROR))
        .expect("end_error event");
    assert_eq!(failure.err_code(), Some("ERR_LOCK_VIOLATION"));
    assert!(failure.field("message").unwrap().contains("Snow Day"));
    assert!(events.iter().all(|e| e.event() != Some(EVENT_END)));
}

#[test]
fn test_failed_undo_logs_trace_id() {
    let capture = init_test_capture();
    let other_writer = SharedStore::default();
    let mut coord = coordinator_over(other_writer.clone(), vec![]);
    let trace = TraceId::new();
    let ctx = RequestContext::new("ana").with_trace_id(trace.clone());
    let created = coord
        .execute(&ctx, MutationIntent::create(EntityType::Class, named("A")))
        .unwrap();
    coord
        .execute(&ctx, MutationIntent::update(EntityType::Class, created.entity_id, named("B")))
        .unwrap();
    other_writer
        .0
        .borrow_mut()
        .delete(EntityType::Class, created.entity_id)
        .unwrap();

    coord.undo(&ctx).unwrap_err();

    let failure = capture
        .events_for_request("undo", ctx.request_id.as_str())
        .into_iter()
        .find(|e| e.event() == Some(EVENT_END_ERROR))
        .expect("end_error event");
    assert_eq!(failure.err_code(), Some("ERR_STALE_REFERENCE"));
    assert_eq!(failure.field("trace_id"), Some(trace.as_str()));
}
