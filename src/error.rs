use std::time::Duration;

use thiserror::Error;

use crate::capacity::AccessKind;
use crate::classify::AccessScope;

/// Failures raised by the node client while running a simulation.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("simulate request timed out after {0:?}")]
    Timeout(Duration),

    #[error("simulate request cancelled")]
    Cancelled,

    #[error("malformed simulate response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Canonical error type of a packing pass. Every variant aborts the pass;
/// nothing is retried or partially applied.
#[derive(Debug, Error)]
pub enum PackError {
    /// The group would fail for a reason unrelated to missing references.
    #[error("simulation failed in transaction {index}: {message}")]
    SimulationFailure { index: usize, message: String },

    #[error(
        "no transaction below reference limit for {kind} access ({scope}); \
         add another contract call to the group and retry"
    )]
    CapacityExhausted { kind: AccessKind, scope: AccessScope },

    #[error("unsupported {kind} access reported at {scope}")]
    UnsupportedAccess { kind: AccessKind, scope: AccessScope },

    /// The simulation report contradicts an assumption about its shape.
    #[error("simulation protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("invalid transaction group: {0}")]
    InvalidGroup(String),

    #[error("simulate call failed: {0}")]
    Node(#[from] NodeError),
}

impl PackError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::SimulationFailure { .. } => "simulation_failure",
            Self::CapacityExhausted { .. } => "capacity_exhausted",
            Self::UnsupportedAccess { .. } => "unsupported_access",
            Self::ProtocolViolation(_) => "protocol_violation",
            Self::InvalidGroup(_) => "invalid_group",
            Self::Node(_) => "node",
        }
    }

    /// Whether enlarging the group and packing again can succeed.
    pub fn needs_larger_group(&self) -> bool {
        matches!(self, Self::CapacityExhausted { .. })
    }
}

/// Failure to load a [`crate::config::PackerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid packer config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_message_tells_the_caller_to_grow_the_group() {
        let err = PackError::CapacityExhausted {
            kind: AccessKind::Account,
            scope: AccessScope::Group,
        };
        let message = err.to_string();
        assert!(message.contains("account access (group)"), "{message}");
        assert!(message.contains("add another contract call"));
        assert!(err.needs_larger_group());
        assert_eq!(err.error_kind(), "capacity_exhausted");
    }

    #[test]
    fn node_errors_convert_into_pack_errors() {
        let err: PackError = NodeError::Cancelled.into();
        assert_eq!(err.error_kind(), "node");
        assert!(!err.needs_larger_group());
        assert_eq!(err.to_string(), "simulate call failed: simulate request cancelled");
    }
}
