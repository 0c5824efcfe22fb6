//! Engine configuration
//!
//! Loaded from TOML, then overridden by `REGISTREE_*` environment variables:
//!
//! | Variable                | Field          | Format            |
//! |-------------------------|----------------|-------------------|
//! | `REGISTREE_ACTOR`       | `default_actor`| any text          |
//! | `REGISTREE_AUTO_SAVE`   | `auto_save`    | `true`/`false`/`1`/`0` |
//! | `REGISTREE_SCHOOL_DAYS` | `school_days`  | `Mon,Tue,Wed`     |

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dirty::AutoSaveFlag;
use crate::errors::{RegisTreeError, Result};
use crate::logging_facility::Profile;
use crate::model::{ConsumerKind, LockKind, WeeklySchedule};
use crate::policy::{CalendarSource, LockPolicyEngine};

pub const ENV_ACTOR: &str = "REGISTREE_ACTOR";
pub const ENV_AUTO_SAVE: &str = "REGISTREE_AUTO_SAVE";
pub const ENV_SCHOOL_DAYS: &str = "REGISTREE_SCHOOL_DAYS";

fn default_actor() -> String {
    registree_core_types::SYSTEM_ACTOR.to_string()
}

fn default_school_days() -> Vec<String> {
    WeeklySchedule::default().day_names()
}

fn default_consumer_exceptions() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([(
        ConsumerKind::STAFF_SELF.to_string(),
        vec![LockKind::TeachersOnly.as_str().to_string()],
    )])
}

fn default_log_profile() -> String {
    "development".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Actor recorded when a request names none
    #[serde(default = "default_actor")]
    pub default_actor: String,

    /// Whether committed rows are written immediately
    #[serde(default)]
    pub auto_save: bool,

    /// Weekdays school is in session ("Mon", "Tue", ...)
    #[serde(default = "default_school_days")]
    pub school_days: Vec<String>,

    /// Consumer name to the lock kinds it ignores
    #[serde(default = "default_consumer_exceptions")]
    pub consumer_exceptions: BTreeMap<String, Vec<String>>,

    /// `development`, `production` or `test`
    #[serde(default = "default_log_profile")]
    pub log_profile: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_actor: default_actor(),
            auto_save: false,
            school_days: default_school_days(),
            consumer_exceptions: default_consumer_exceptions(),
            log_profile: default_log_profile(),
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// `InvalidConfig` when the text is not valid TOML for this shape.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| RegisTreeError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Read a TOML file
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| RegisTreeError::InvalidConfig {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Apply overrides from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when `REGISTREE_AUTO_SAVE` is not a boolean.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(actor) = lookup(ENV_ACTOR).filter(|a| !a.trim().is_empty()) {
            self.default_actor = actor;
        }
        if let Some(raw) = lookup(ENV_AUTO_SAVE) {
            self.auto_save = parse_bool(&raw).ok_or_else(|| RegisTreeError::InvalidConfig {
                message: format!("{} must be a boolean, got '{}'", ENV_AUTO_SAVE, raw),
            })?;
        }
        if let Some(raw) = lookup(ENV_SCHOOL_DAYS) {
            self.school_days = raw
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// # Errors
    ///
    /// `InvalidConfig` on an unknown day name.
    pub fn weekly_schedule(&self) -> Result<WeeklySchedule> {
        WeeklySchedule::from_day_names(&self.school_days)
    }

    /// Lock engine over `calendar` with this config's exception table
    ///
    /// The table replaces the built-in default, so a config can also remove
    /// the staff exception.
    pub fn lock_engine(&self, calendar: Box<dyn CalendarSource>) -> Result<LockPolicyEngine> {
        let mut engine = LockPolicyEngine::without_exceptions(calendar);
        for (consumer, kinds) in &self.consumer_exceptions {
            let kinds = kinds
                .iter()
                .map(|k| k.parse::<LockKind>())
                .collect::<Result<Vec<_>>>()?;
            engine.register_exception(ConsumerKind::new(consumer.as_str()), kinds);
        }
        Ok(engine)
    }

    pub fn auto_save_flag(&self) -> AutoSaveFlag {
        AutoSaveFlag::new(self.auto_save)
    }

    pub fn profile(&self) -> Result<Profile> {
        self.log_profile.parse()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(!config.auto_save);
        assert_eq!(config.default_actor, "System");
        assert_eq!(config.school_days, vec!["Mon", "Tue", "Wed", "Thu", "Fri"]);
        assert_eq!(
            config.consumer_exceptions.get("staff-self"),
            Some(&vec!["Teachers Only".to_string()])
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("auto_save = true\n").unwrap();
        assert!(config.auto_save);
        assert_eq!(config.school_days.len(), 5);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = EngineConfig::from_toml_str("auto_save = \"maybe\"").unwrap_err();
        assert!(matches!(err, RegisTreeError::InvalidConfig { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars = HashMap::from([
            (ENV_ACTOR, "front-office"),
            (ENV_AUTO_SAVE, "1"),
            (ENV_SCHOOL_DAYS, "Mon, Wed ,Fri"),
        ]);
        let mut config = EngineConfig::default();
        config
            .apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.default_actor, "front-office");
        assert!(config.auto_save);
        assert_eq!(config.school_days, vec!["Mon", "Wed", "Fri"]);
    }

    #[test]
    fn test_invalid_auto_save_override() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_overrides_from(|k| (k == ENV_AUTO_SAVE).then(|| "sometimes".to_string()))
            .unwrap_err();
        assert!(matches!(err, RegisTreeError::InvalidConfig { .. }));
    }

    #[test]
    fn test_unknown_school_day_rejected() {
        let config = EngineConfig {
            school_days: vec!["Funday".to_string()],
            ..EngineConfig::default()
        };
        assert!(config.weekly_schedule().is_err());
    }
}
