//! Agent client errors

use thiserror::Error;

/// Errors that can occur when talking to a node's checkpoint agent
#[derive(Debug, Error)]
pub enum AgentError {
    /// Kubernetes API error while resolving the agent endpoint
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Node has no InternalIP address to dial
    #[error("no internal IP found for node {0}")]
    NoInternalIp(String),

    /// gRPC transport error (dial, connection)
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// RPC completed with a gRPC status error
    #[error("RPC failed: {0}")]
    Rpc(#[from] tonic::Status),

    /// Agent reported a checkpoint failure
    #[error("checkpoint failed: {0}")]
    Checkpoint(String),

    /// Agent reported an image packaging failure
    #[error("packaging failed: {0}")]
    Package(String),

    /// Agent reported itself unhealthy
    #[error("agent unhealthy: {0}")]
    Unhealthy(String),
}
