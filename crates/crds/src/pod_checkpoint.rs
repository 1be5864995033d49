//! PodCheckpoint CRD
//!
//! Requests a checkpoint of every container in a running pod. The reconciler
//! fans out one ContainerCheckpoint per container and aggregates the results
//! into a PodCheckpointContent.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "lpm.microscaler.io",
    version = "v1alpha1",
    kind = "PodCheckpoint",
    namespaced,
    status = "PodCheckpointStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PodCheckpointSpec {
    /// Name of the pod to checkpoint
    pub pod_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct PodCheckpointStatus {
    /// Lifecycle phase
    #[serde(default)]
    pub phase: PodCheckpointPhase,

    /// Human-readable summary of the most recent transition or error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// True once every container checkpoint succeeded and content is bound
    #[serde(default)]
    pub ready: bool,

    /// Name of the PodCheckpointContent aggregating the container contents.
    /// Empty until every child has succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_content_name: Option<String>,

    /// When the checkpoint was captured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<chrono::DateTime<chrono::Utc>>,

    /// When the phase became terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Checkpoint lifecycle phase
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum PodCheckpointPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl PodCheckpointPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_defaults_to_pending() {
        assert_eq!(
            PodCheckpointStatus::default().phase,
            PodCheckpointPhase::Pending
        );
    }

    #[test]
    fn status_omits_unset_fields() {
        let json = serde_json::to_value(PodCheckpointStatus::default()).unwrap();
        assert_eq!(json["phase"], "Pending");
        assert!(json.get("boundContentName").is_none());
        assert!(json.get("completionTime").is_none());
    }
}
