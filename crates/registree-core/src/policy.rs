//! Temporal lock policy
//!
//! Decides whether a date is open for edits for a given consumer. Calendar
//! rules come from a [`CalendarSource`]; consumers can be exempted from
//! specific lock kinds (staff may still check in on a "Teachers Only" day).
//!
//! # Example
//! ```
//! use chrono::NaiveDate;
//! use registree_core::model::{ConsumerKind, LockKind, LockRule};
//! use registree_core::policy::{LockPolicyEngine, StaticCalendar};
//!
//! let pd_day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
//! let mut calendar = StaticCalendar::default();
//! calendar.add_rule(LockRule::on(pd_day, LockKind::TeachersOnly, "PD Day"));
//!
//! let engine = LockPolicyEngine::new(Box::new(calendar));
//! assert!(engine.is_locked(pd_day, &ConsumerKind::student_roster()).is_some());
//! assert!(engine.is_locked(pd_day, &ConsumerKind::staff_self()).is_none());
//! ```

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::model::{ConsumerKind, LockKind, LockReason, LockRule, WeeklySchedule};

/// Read-only calendar input to the lock engine
pub trait CalendarSource {
    /// Rules whose inclusive range contains `date`
    fn rules_covering(&self, date: NaiveDate) -> Vec<LockRule>;

    fn weekly_schedule(&self) -> WeeklySchedule;
}

/// Calendar held in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticCalendar {
    rules: Vec<LockRule>,
    schedule: WeeklySchedule,
}

impl StaticCalendar {
    pub fn new(rules: Vec<LockRule>, schedule: WeeklySchedule) -> Self {
        Self { rules, schedule }
    }

    pub fn add_rule(&mut self, rule: LockRule) {
        self.rules.push(rule);
    }

    pub fn set_schedule(&mut self, schedule: WeeklySchedule) {
        self.schedule = schedule;
    }

    pub fn rules(&self) -> &[LockRule] {
        &self.rules
    }
}

impl CalendarSource for StaticCalendar {
    fn rules_covering(&self, date: NaiveDate) -> Vec<LockRule> {
        self.rules.iter().filter(|r| r.covers(date)).cloned().collect()
    }

    fn weekly_schedule(&self) -> WeeklySchedule {
        self.schedule.clone()
    }
}

/// Lock decision engine
pub struct LockPolicyEngine {
    calendar: Box<dyn CalendarSource>,
    exceptions: HashMap<ConsumerKind, HashSet<LockKind>>,
}

impl LockPolicyEngine {
    /// Engine with the default exception table (`staff-self` ignores Teachers Only)
    pub fn new(calendar: Box<dyn CalendarSource>) -> Self {
        let mut engine = Self::without_exceptions(calendar);
        engine.register_exception(ConsumerKind::staff_self(), [LockKind::TeachersOnly]);
        engine
    }

    pub fn without_exceptions(calendar: Box<dyn CalendarSource>) -> Self {
        Self {
            calendar,
            exceptions: HashMap::new(),
        }
    }

    /// Exempt `consumer` from the given lock kinds, replacing any earlier entry
    pub fn register_exception(
        &mut self,
        consumer: ConsumerKind,
        ignored: impl IntoIterator<Item = LockKind>,
    ) {
        self.exceptions.insert(consumer, ignored.into_iter().collect());
    }

    pub fn replace_calendar(&mut self, calendar: Box<dyn CalendarSource>) {
        self.calendar = calendar;
    }

    pub fn weekly_schedule(&self) -> WeeklySchedule {
        self.calendar.weekly_schedule()
    }

    fn ignores(&self, consumer: &ConsumerKind, kind: LockKind) -> bool {
        self.exceptions
            .get(consumer)
            .is_some_and(|kinds| kinds.contains(&kind))
    }

    /// Reason `date` is locked for `consumer`, or `None` when editable
    ///
    /// The highest-priority applicable rule wins (No School, then Teachers
    /// Only, then Custom). Ties go to the earliest start date, then the
    /// lexically smallest label, so rule order never changes the answer.
    /// With no applicable rule, a weekday outside the school schedule is
    /// still locked as a non-school day.
    pub fn is_locked(&self, date: NaiveDate, consumer: &ConsumerKind) -> Option<LockReason> {
        let winner = self
            .calendar
            .rules_covering(date)
            .into_iter()
            .filter(|rule| rule.covers(date) && !self.ignores(consumer, rule.kind))
            .min_by(|a, b| {
                b.kind
                    .priority()
                    .cmp(&a.kind.priority())
                    .then_with(|| a.start_date.cmp(&b.start_date))
                    .then_with(|| a.label.cmp(&b.label))
            });

        if let Some(rule) = winner {
            return Some(LockReason::from(&rule));
        }

        if !self.calendar.weekly_schedule().is_school_day(date)
            && !self.ignores(consumer, LockKind::NoSchool)
        {
            return Some(LockReason::non_school_day());
        }

        None
    }

    /// Every locked date in `start..=end` with its reason
    pub fn locked_days(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        consumer: &ConsumerKind,
    ) -> Vec<(NaiveDate, LockReason)> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter_map(|d| self.is_locked(d, consumer).map(|reason| (d, reason)))
            .collect()
    }
}

impl std::fmt::Debug for LockPolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockPolicyEngine")
            .field("exceptions", &self.exceptions)
            .finish_non_exhaustive()
    }
}
