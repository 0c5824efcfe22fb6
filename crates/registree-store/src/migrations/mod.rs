//! Migration framework
//!
//! Embedded SQL scripts applied once each, in order, and recorded in
//! `schema_version` with their checksum. Re-running is a no-op; a script
//! whose text changed after it was applied is rejected.

mod checksums;
mod embedded;
mod runner;

pub use runner::{applied_migrations, apply_migrations};
