//! ContainerCheckpoint CRD
//!
//! Requests a checkpoint of a single container in a running pod.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "lpm.microscaler.io",
    version = "v1alpha1",
    kind = "ContainerCheckpoint",
    namespaced,
    status = "ContainerCheckpointStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ContainerCheckpointSpec {
    /// Name of the pod holding the container
    pub pod_name: String,

    /// Name of the container to checkpoint
    pub container_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContainerCheckpointStatus {
    /// Lifecycle phase
    #[serde(default)]
    pub phase: ContainerCheckpointPhase,

    /// Human-readable summary of the most recent transition or error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// True once the checkpoint succeeded and content is bound
    #[serde(default)]
    pub ready: bool,

    /// Name of the ContainerCheckpointContent carrying the artifact.
    /// Empty until the agent call has succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_content_name: Option<String>,

    /// When the phase became terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Checkpoint lifecycle phase
///
/// Succeeded and Failed are sticky: reconciliation of a terminal object is
/// a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum ContainerCheckpointPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl ContainerCheckpointPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_defaults_to_pending() {
        let status = ContainerCheckpointStatus::default();
        assert_eq!(status.phase, ContainerCheckpointPhase::Pending);
        assert!(!status.ready);
    }

    #[test]
    fn phase_serializes_pascal_case() {
        let phase = ContainerCheckpointPhase::Succeeded;
        assert_eq!(serde_json::to_string(&phase).unwrap(), "\"Succeeded\"");
    }

    #[test]
    fn terminal_phases() {
        assert!(ContainerCheckpointPhase::Succeeded.is_terminal());
        assert!(ContainerCheckpointPhase::Failed.is_terminal());
        assert!(!ContainerCheckpointPhase::Pending.is_terminal());
        assert!(!ContainerCheckpointPhase::Running.is_terminal());
    }
}
