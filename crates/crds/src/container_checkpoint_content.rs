//! ContainerCheckpointContent CRD
//!
//! The payload-bearing twin of a ContainerCheckpoint: created exactly once
//! after a successful agent call, immutable thereafter. Its existence marks
//! the artifact as published.

use crate::references::CheckpointReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "lpm.microscaler.io",
    version = "v1alpha1",
    kind = "ContainerCheckpointContent",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ContainerCheckpointContentSpec {
    /// The ContainerCheckpoint this content binds to
    pub container_checkpoint_ref: CheckpointReference,

    /// Namespace of the checkpointed pod
    pub pod_namespace: String,

    /// Name of the checkpointed pod
    pub pod_name: String,

    /// Name of the checkpointed container
    pub container_name: String,

    /// Location of the archive: `shared://<filename>` in the shared store,
    /// or `file://<path>` as a host-local fallback
    pub artifact_uri: String,
}
