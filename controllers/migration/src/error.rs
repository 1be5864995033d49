//! Controller-specific error types.
//!
//! Validation failures are not errors: they settle the object in a terminal
//! Failed phase with a message. The variants below cover everything that
//! should be retried (transient infrastructure) or surfaced to the operator.

use agent_client::AgentError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the migration controllers.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Checkpoint agent error
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Object is missing a required metadata field
    #[error("Missing object key: {0}")]
    MissingObjectKey(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    #[allow(dead_code)] // Reserved for future use
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
