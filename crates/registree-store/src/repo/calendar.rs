//! Lock calendar built from persisted events and settings

use std::rc::Rc;

use registree_core::calendar_sync::calendar_from_records;
use registree_core::StaticCalendar;
use rusqlite::Connection;

use crate::repo::SqliteRecordStore;

/// Build a [`StaticCalendar`] from stored `CalendarEvent` and `Settings` rows
///
/// # Errors
///
/// Persistence failures while reading rows. Malformed events are skipped.
pub fn load_calendar(conn: Rc<Connection>) -> registree_core::Result<StaticCalendar> {
    calendar_from_records(&SqliteRecordStore::new(conn))
}
