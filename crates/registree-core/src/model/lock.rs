use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::RegisTreeError;

/// Label used for days locked only because the weekly schedule skips them
pub const NON_SCHOOL_DAY_LABEL: &str = "Non-school day";

/// Calendar event types that can lock a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockKind {
    NoSchool,
    TeachersOnly,
    Custom,
}

impl LockKind {
    pub const ALL: [LockKind; 3] = [LockKind::NoSchool, LockKind::TeachersOnly, LockKind::Custom];

    /// Name as stored on calendar events
    pub fn as_str(&self) -> &'static str {
        match self {
            LockKind::NoSchool => "No School",
            LockKind::TeachersOnly => "Teachers Only",
            LockKind::Custom => "Custom",
        }
    }

    /// Higher wins when several rules cover the same date
    pub fn priority(&self) -> u8 {
        match self {
            LockKind::NoSchool => 2,
            LockKind::TeachersOnly => 1,
            LockKind::Custom => 0,
        }
    }

    /// Whether creating an event of this kind marks attendance "No School"
    pub fn propagates_to_attendance(&self) -> bool {
        matches!(self, LockKind::NoSchool | LockKind::TeachersOnly)
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockKind {
    type Err = RegisTreeError;

    /// Accepts the stored names ("No School") and compact forms ("NoSchool", "no-school")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "noschool" => Ok(LockKind::NoSchool),
            "teachersonly" => Ok(LockKind::TeachersOnly),
            "custom" => Ok(LockKind::Custom),
            _ => Err(RegisTreeError::InvalidConfig {
                message: format!("unknown lock kind '{}'", s),
            }),
        }
    }
}

/// A calendar event range that may lock edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRule {
    pub start_date: NaiveDate,
    /// Inclusive
    pub end_date: NaiveDate,
    pub kind: LockKind,
    pub label: String,
}

impl LockRule {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        kind: LockKind,
        label: impl Into<String>,
    ) -> Self {
        Self {
            start_date,
            end_date,
            kind,
            label: label.into(),
        }
    }

    /// Single-day rule
    pub fn on(date: NaiveDate, kind: LockKind, label: impl Into<String>) -> Self {
        Self::new(date, date, kind, label)
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Every date in the rule, start to end
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date;
        self.start_date.iter_days().take_while(move |d| *d <= end)
    }
}

/// Why a date is locked; shown to the user as-is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockReason {
    pub kind: LockKind,
    pub label: String,
}

impl LockReason {
    pub fn non_school_day() -> Self {
        Self {
            kind: LockKind::NoSchool,
            label: NON_SCHOOL_DAY_LABEL.to_string(),
        }
    }
}

impl From<&LockRule> for LockReason {
    fn from(rule: &LockRule) -> Self {
        Self {
            kind: rule.kind,
            label: rule.label.clone(),
        }
    }
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "locked until policy changes ({}: {})", self.kind, self.label)
    }
}

const DEFAULT_SCHOOL_DAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Weekdays on which school is in session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklySchedule {
    days: HashSet<Weekday>,
}

impl WeeklySchedule {
    pub fn new(days: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            days: days.into_iter().collect(),
        }
    }

    /// Parse day names such as "Mon" or "Tuesday"
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on an unrecognised name.
    pub fn from_day_names<S: AsRef<str>>(names: &[S]) -> Result<Self, RegisTreeError> {
        let days = names
            .iter()
            .map(|n| {
                n.as_ref()
                    .trim()
                    .parse::<Weekday>()
                    .map_err(|_| RegisTreeError::InvalidConfig {
                        message: format!("unknown weekday '{}'", n.as_ref()),
                    })
            })
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self { days })
    }

    /// Parse the stored `["Mon","Tue",...]` settings list
    ///
    /// Missing, empty or malformed input yields the Mon–Fri default.
    pub fn from_settings_json(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return Self::default();
        };
        serde_json::from_str::<Vec<String>>(raw)
            .ok()
            .and_then(|names| Self::from_day_names(&names).ok())
            .unwrap_or_default()
    }

    pub fn is_school_day(&self, date: NaiveDate) -> bool {
        self.days.contains(&date.weekday())
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    /// Short day names in Monday-first order
    pub fn day_names(&self) -> Vec<String> {
        let mut days: Vec<Weekday> = self.days.iter().copied().collect();
        days.sort_by_key(|d| d.num_days_from_monday());
        days.into_iter().map(|d| d.to_string()).collect()
    }
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self::new(DEFAULT_SCHOOL_DAYS)
    }
}

/// Class of record a lock check is made for
///
/// Consumers register which lock kinds they are exempt from, so staff can
/// still check in on a "Teachers Only" day that freezes student attendance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerKind(String);

impl ConsumerKind {
    pub const STUDENT_ROSTER: &'static str = "student-roster";
    pub const STAFF_SELF: &'static str = "staff-self";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn student_roster() -> Self {
        Self::new(Self::STUDENT_ROSTER)
    }

    pub fn staff_self() -> Self {
        Self::new(Self::STAFF_SELF)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Date and consumer a mutation is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockScope {
    pub date: NaiveDate,
    pub consumer: ConsumerKind,
}

impl LockScope {
    pub fn new(date: NaiveDate, consumer: ConsumerKind) -> Self {
        Self { date, consumer }
    }
}
