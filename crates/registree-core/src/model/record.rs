use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::snapshot::Snapshot;
use crate::errors::RegisTreeError;

/// Kinds of records the registry keeps
///
/// The string names are the ones written to audit records and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    Student,
    Teacher,
    Class,
    Enrollment,
    Attendance,
    TeacherAttendance,
    TeacherClassLink,
    CalendarEvent,
    Settings,
}

impl EntityType {
    pub const ALL: [EntityType; 9] = [
        EntityType::Student,
        EntityType::Teacher,
        EntityType::Class,
        EntityType::Enrollment,
        EntityType::Attendance,
        EntityType::TeacherAttendance,
        EntityType::TeacherClassLink,
        EntityType::CalendarEvent,
        EntityType::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Student => "Student",
            EntityType::Teacher => "Teacher",
            EntityType::Class => "Class",
            EntityType::Enrollment => "Enrollment",
            EntityType::Attendance => "Attendance",
            EntityType::TeacherAttendance => "TeacherAttendance",
            EntityType::TeacherClassLink => "TeacherClassLink",
            EntityType::CalendarEvent => "CalendarEvent",
            EntityType::Settings => "Settings",
        }
    }

    /// Whether rows of this type shape the lock calendar
    pub fn feeds_calendar(&self) -> bool {
        matches!(self, EntityType::CalendarEvent | EntityType::Settings)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = RegisTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .iter()
            .copied()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RegisTreeError::InvalidIntent {
                reason: format!("unknown entity type '{}'", s),
            })
    }
}

/// Primary key of a record within its entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl EntityId {
    /// The id a sequence hands out after this one
    ///
    /// # Errors
    ///
    /// `InvalidIntent` when this id is already `i64::MAX`.
    pub fn successor(self, entity_type: EntityType) -> Result<EntityId, RegisTreeError> {
        self.0
            .checked_add(1)
            .map(EntityId)
            .ok_or_else(|| RegisTreeError::InvalidIntent {
                reason: format!("{} id {} is the last one available", entity_type, self),
            })
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        EntityId(value)
    }
}

/// One row of the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub entity_type: EntityType,
    pub id: EntityId,
    pub fields: Snapshot,
}

impl Record {
    pub fn new(entity_type: EntityType, id: EntityId, fields: Snapshot) -> Self {
        Self {
            entity_type,
            id,
            fields,
        }
    }
}
