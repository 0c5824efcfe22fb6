use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{EntityId, EntityType};
use super::snapshot::Snapshot;
use crate::errors::RegisTreeError;

/// What a persisted-row mutation did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }

    /// Action implied by the presence of before/after state
    pub fn from_shape(before: bool, after: bool) -> Option<AuditAction> {
        match (before, after) {
            (false, true) => Some(AuditAction::Create),
            (true, true) => Some(AuditAction::Update),
            (true, false) => Some(AuditAction::Delete),
            (false, false) => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = RegisTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(AuditAction::Create),
            "update" => Ok(AuditAction::Update),
            "delete" => Ok(AuditAction::Delete),
            other => Err(RegisTreeError::Serialization {
                message: format!("unknown audit action '{}'", other),
            }),
        }
    }
}

/// Opaque ledger-assigned id of an audit record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(pub u64);

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Audit record before the ledger has assigned it an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditRecord {
    pub actor: String,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub timestamp: DateTime<Utc>,
    pub before: Option<Snapshot>,
    pub after: Option<Snapshot>,
}

impl NewAuditRecord {
    pub fn with_id(self, id: AuditId) -> AuditLogRecord {
        AuditLogRecord {
            id,
            actor: self.actor,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            timestamp: self.timestamp,
            before: self.before,
            after: self.after,
        }
    }
}

/// Immutable ledger entry for one persisted-row mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogRecord {
    pub id: AuditId,
    pub actor: String,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub timestamp: DateTime<Utc>,
    pub before: Option<Snapshot>,
    pub after: Option<Snapshot>,
}

impl AuditLogRecord {
    /// Field names that differ between before and after (empty for create/delete)
    pub fn changed_fields(&self) -> Vec<String> {
        match (&self.before, &self.after) {
            (Some(before), Some(after)) => before.changed_fields(after),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_shape() {
        assert_eq!(AuditAction::from_shape(false, true), Some(AuditAction::Create));
        assert_eq!(AuditAction::from_shape(true, true), Some(AuditAction::Update));
        assert_eq!(AuditAction::from_shape(true, false), Some(AuditAction::Delete));
        assert_eq!(AuditAction::from_shape(false, false), None);
    }

    #[test]
    fn test_action_strings() {
        for action in [AuditAction::Create, AuditAction::Update, AuditAction::Delete] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
        assert!("purge".parse::<AuditAction>().is_err());
    }
}
