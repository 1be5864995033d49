//! PodMigration CRD
//!
//! The top-level declarative intent: move a running pod to another node,
//! preserving in-process state via checkpoint/restore.

use crate::references::LocalReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "lpm.microscaler.io",
    version = "v1alpha1",
    kind = "PodMigration",
    namespaced,
    status = "PodMigrationStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PodMigrationSpec {
    /// Name of the pod to migrate
    pub pod_name: String,

    /// Node the pod should be restored on. Empty delegates placement to the
    /// scheduler.
    #[serde(default)]
    pub target_node: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct PodMigrationStatus {
    /// Lifecycle phase
    #[serde(default)]
    pub phase: PodMigrationPhase,

    /// Human-readable summary of the most recent transition or error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// The PodCheckpoint this migration spawned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_checkpoint_ref: Option<LocalReference>,

    /// Name of the restored pod once it has been created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_pod_name: Option<String>,
}

/// Migration lifecycle phase
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum PodMigrationPhase {
    #[default]
    Pending,
    Checkpointing,
    CheckpointComplete,
    Restoring,
    Succeeded,
    Failed,
}

impl PodMigrationPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}
