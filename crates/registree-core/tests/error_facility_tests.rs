//! Stable error codes surfaced by engine operations

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{coordinator, named};
use registree_core::{
    EngineConfig, EntityId, EntityType, ExError, ExErrorKind, MutationIntent, RegisTreeError,
    RequestContext, Snapshot,
};

#[test]
fn test_update_of_missing_record_is_not_found() {
    let mut coord = coordinator();
    let err = coord
        .execute(
            &RequestContext::new("ana"),
            MutationIntent::update(EntityType::Student, EntityId(42), named("Ghost")),
        )
        .unwrap_err();

    let ex = ExError::from(err);
    assert_eq!(ex.kind(), ExErrorKind::NotFound);
    assert_eq!(ex.code(), "ERR_NOT_FOUND");
    assert_eq!(ex.entity_type(), Some("Student"));
    assert_eq!(ex.entity_id(), Some("42"));
}

#[test]
fn test_empty_create_is_invalid_input() {
    let mut coord = coordinator();
    let err = coord
        .execute(
            &RequestContext::new("ana"),
            MutationIntent::create(EntityType::Class, Snapshot::new()),
        )
        .unwrap_err();

    assert!(matches!(err, RegisTreeError::InvalidIntent { .. }));
    assert_eq!(err.kind().code(), "ERR_INVALID_INPUT");
}

#[test]
fn test_explicit_id_collision_is_already_exists() {
    let mut coord = coordinator();
    let ctx = RequestContext::new("ana");
    let a = coord
        .execute(&ctx, MutationIntent::create(EntityType::Class, named("A")))
        .unwrap();

    let err = coord
        .execute(
            &ctx,
            MutationIntent::Create {
                entity_type: EntityType::Class,
                id: Some(a.entity_id),
                values: named("B"),
                lock_scope: None,
            },
        )
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::AlreadyExists);
    assert_eq!(coord.audit().len().unwrap(), 1);
}

#[test]
fn test_bad_config_is_config_error() {
    let err = EngineConfig::from_toml_str("auto_save = \"sometimes\"").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Config);

    let err = EngineConfig::from_toml_str("school_days = [\"Funday\"]")
        .unwrap()
        .weekly_schedule()
        .unwrap_err();
    assert_eq!(ExError::from(err).code(), "ERR_CONFIG");
}
