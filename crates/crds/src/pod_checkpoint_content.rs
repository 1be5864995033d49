//! PodCheckpointContent CRD
//!
//! Aggregates the per-container contents of a completed PodCheckpoint.

use crate::references::{CheckpointReference, LocalReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "lpm.microscaler.io",
    version = "v1alpha1",
    kind = "PodCheckpointContent",
    namespaced,
    status = "PodCheckpointContentStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PodCheckpointContentSpec {
    /// The PodCheckpoint this content binds to
    pub pod_checkpoint_ref: CheckpointReference,

    /// Namespace of the checkpointed pod
    pub pod_namespace: String,

    /// Name of the checkpointed pod
    pub pod_name: String,

    /// Names of the ContainerCheckpointContent objects, one per container
    pub container_contents: Vec<LocalReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct PodCheckpointContentStatus {
    /// Flips to true atomically with the owning PodCheckpoint's Succeeded
    /// transition
    #[serde(default)]
    pub ready: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<chrono::DateTime<chrono::Utc>>,
}
