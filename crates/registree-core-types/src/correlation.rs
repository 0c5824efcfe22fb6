//! Correlation types for request tracking and tracing
//!
//! Every mutation handled by the engine runs under a `RequestContext`, so the
//! log lines of one form submission (lock check, write, audit, change log)
//! can be stitched back together.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! correlation_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Generate a new time-ordered id (UUIDv7)
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Wrap an existing id string (e.g. one read back from a log)
            pub fn from_string(s: String) -> Self {
                Self(s)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

correlation_id!(
    /// Identifier of a single engine request (one mutation intent, one undo, one batch save)
    RequestId
);

correlation_id!(
    /// Identifier spanning several requests issued by the same user gesture
    TraceId
);

correlation_id!(
    /// Identifier of a nested step inside a request
    SpanId
);

/// Actor recorded when the caller does not name one
pub const SYSTEM_ACTOR: &str = "System";

/// Context carried through one engine request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub trace_id: Option<TraceId>,
    /// Who is performing the mutation ("Admin", "System", a user name)
    pub actor: String,
}

impl RequestContext {
    /// Create a context for `actor` with a fresh RequestId
    ///
    /// A blank actor is normalised to [`SYSTEM_ACTOR`].
    pub fn new(actor: impl Into<String>) -> Self {
        let actor = actor.into();
        let actor = if actor.trim().is_empty() {
            SYSTEM_ACTOR.to_string()
        } else {
            actor
        };
        Self {
            request_id: RequestId::new(),
            trace_id: None,
            actor,
        }
    }

    /// Context for engine-initiated mutations
    pub fn system() -> Self {
        Self::new(SYSTEM_ACTOR)
    }

    /// Attach a TraceId shared with sibling requests
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_generation() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_display_matches_as_str() {
        let id = TraceId::new();
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn test_blank_actor_becomes_system() {
        let ctx = RequestContext::new("   ");
        assert_eq!(ctx.actor, SYSTEM_ACTOR);

        let ctx = RequestContext::new("Admin");
        assert_eq!(ctx.actor, "Admin");
        assert!(ctx.trace_id.is_none());
    }

    #[test]
    fn test_context_with_trace_id() {
        let trace_id = TraceId::new();
        let ctx = RequestContext::system().with_trace_id(trace_id.clone());
        assert_eq!(ctx.trace_id, Some(trace_id));
    }

    #[test]
    fn test_serialization() {
        let id = SpanId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: SpanId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
