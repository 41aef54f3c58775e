//! Error types for signal tree operations.
//!
//! Tree operations used from the audio thread degrade instead of failing;
//! these errors report *why* they degraded so callers off the audio thread
//! can react.

use thiserror::Error;
use uuid::Uuid;

use crate::scope::Scope;

/// Errors reported by container and instance operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    /// The container has no template to derive from
    #[error("container {container} has no template")]
    MissingTemplate {
        /// Container that was asked to derive an instance.
        container: Uuid,
    },

    /// Another playback instance already renders this scope
    #[error("container {container} already hosts an instance for {scope:?}")]
    ScopeOccupied {
        /// Container holding the conflicting instance.
        container: Uuid,
        /// Scope that is already taken.
        scope: Scope,
    },

    /// The instance is attached to a different container
    #[error("instance {instance} belongs to another container")]
    ForeignInstance {
        /// Instance that was passed in.
        instance: Uuid,
    },
}

impl SignalError {
    /// Create a missing template error.
    pub fn missing_template(container: Uuid) -> Self {
        SignalError::MissingTemplate { container }
    }

    /// Create a scope occupied error.
    pub fn scope_occupied(container: Uuid, scope: Scope) -> Self {
        SignalError::ScopeOccupied { container, scope }
    }
}
