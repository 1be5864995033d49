//! Reconciliation logic for the migration CRDs.
//!
//! One file per CRD:
//! - `migration`: the end-to-end orchestrator
//! - `pod_checkpoint`: fan-out/fan-in over a pod's containers
//! - `container_checkpoint`: a single container's checkpoint via the agent
//!
//! Each reconcile returns the next `Action` (requeue while waiting on
//! someone else, `await_change` once settled); transient errors bubble up to
//! the watcher's error policy.

pub mod container_checkpoint;
pub mod migration;
pub mod pod_checkpoint;

#[cfg(test)]
mod container_checkpoint_test;
#[cfg(test)]
mod migration_test;

use crate::error::ControllerError;
use agent_client::AgentClientTrait;
use crds::{
    ContainerCheckpoint, ContainerCheckpointContent, PodCheckpoint, PodCheckpointContent,
    PodMigration,
};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::Api;
use std::path::PathBuf;
use std::time::Duration;

/// Requeue delay while waiting on a child or content object
pub(crate) const REQUEUE_SHORT: Duration = Duration::from_secs(2);

/// Requeue delay while waiting on the restored pod
pub(crate) const REQUEUE_RESTORE: Duration = Duration::from_secs(5);

/// Reconciles the migration control plane resources.
pub struct Reconciler {
    pub(crate) agent: Box<dyn AgentClientTrait + Send + Sync>,
    pub(crate) pod_api: Api<Pod>,
    pub(crate) node_api: Api<Node>,
    pub(crate) migration_api: Api<PodMigration>,
    pub(crate) pod_checkpoint_api: Api<PodCheckpoint>,
    pub(crate) container_checkpoint_api: Api<ContainerCheckpoint>,
    pub(crate) container_content_api: Api<ContainerCheckpointContent>,
    pub(crate) pod_content_api: Api<PodCheckpointContent>,
    pub(crate) shared_mount: PathBuf,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent: Box<dyn AgentClientTrait + Send + Sync>,
        pod_api: Api<Pod>,
        node_api: Api<Node>,
        migration_api: Api<PodMigration>,
        pod_checkpoint_api: Api<PodCheckpoint>,
        container_checkpoint_api: Api<ContainerCheckpoint>,
        container_content_api: Api<ContainerCheckpointContent>,
        pod_content_api: Api<PodCheckpointContent>,
        shared_mount: PathBuf,
    ) -> Self {
        Self {
            agent,
            pod_api,
            node_api,
            migration_api,
            pod_checkpoint_api,
            container_checkpoint_api,
            container_content_api,
            pod_content_api,
            shared_mount,
        }
    }
}

/// True when a kube API error is a 404.
pub(crate) fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

/// True when a kube API error is a 409 (name collision with a concurrent
/// creator; the loser binds to the existing object).
pub(crate) fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 409)
}

/// True when the pod reports the Running phase.
pub(crate) fn pod_is_running(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        == Some("Running")
}

/// Pod phase as a string, for dispatching on restored-pod state.
pub(crate) fn pod_phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|status| status.phase.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_pod;

    #[test]
    fn pod_is_running_checks_status_phase() {
        assert!(pod_is_running(&make_pod("p1", "n1", "Running", &["c"])));
        assert!(!pod_is_running(&make_pod("p1", "n1", "Pending", &["c"])));

        let mut no_status = make_pod("p1", "n1", "Running", &["c"]);
        no_status.status = None;
        assert!(!pod_is_running(&no_status));
    }
}
