// Error taxonomy shared by the core and its collaborators.
//
// Data gaps (missing directory entries, unmatched valuations, out-of-scope
// trades) are not errors: they are handled by omission where they occur.

use std::fmt;

use thiserror::Error;

/// Failure of a collaborator call (network, HTTP status, or payload shape).
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("{operation}: request failed: {message}")]
    Transport { operation: String, message: String },

    #[error("{operation}: unexpected HTTP status {status}")]
    Status { operation: String, status: u16 },

    #[error("{operation}: malformed response: {message}")]
    Decode { operation: String, message: String },
}

impl UpstreamError {
    pub fn transport(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        UpstreamError::Transport {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn status(operation: impl Into<String>, status: u16) -> Self {
        UpstreamError::Status {
            operation: operation.into(),
            status,
        }
    }

    pub fn decode(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        UpstreamError::Decode {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Transport failures, rate limiting and server errors may succeed on a
    /// later attempt. A payload we cannot decode will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Transport { .. } => true,
            UpstreamError::Status { status, .. } => *status == 429 || *status >= 500,
            UpstreamError::Decode { .. } => false,
        }
    }
}

/// The kind of entity a lookup failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    League,
    Roster,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Entity::User => "user",
            Entity::League => "league",
            Entity::Roster => "roster",
        };
        f.write_str(s)
    }
}

/// Error returned by the top-level operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl CoreError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(UpstreamError::transport("get_league", "connection reset").is_retryable());
        assert!(UpstreamError::status("get_league", 503).is_retryable());
        assert!(UpstreamError::status("get_league", 429).is_retryable());
        assert!(!UpstreamError::status("get_league", 400).is_retryable());
        assert!(!UpstreamError::decode("get_league", "expected object").is_retryable());
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = CoreError::not_found(Entity::League, "123");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "league not found: 123");
    }

    #[test]
    fn upstream_converts_into_core_error() {
        let err: CoreError = UpstreamError::status("get_rosters", 500).into();
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "get_rosters: unexpected HTTP status 500");
    }
}
