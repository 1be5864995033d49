//! ContainerCheckpoint reconciler
//!
//! Drives a single container's checkpoint: validate the pod, call the agent
//! on the pod's node, create the content object, bind it.
//!
//! The hard invariant is at-most-one successful agent call per object.
//! `status.boundContentName` is checked before anything else in the Running
//! phase: once set, the RPC has already succeeded and the reconciler only
//! finalizes status. Content creation is idempotent through deterministic
//! naming; a 409 loser binds to the existing object.

use super::{is_already_exists, is_not_found, pod_is_running, Reconciler, REQUEUE_SHORT};
use crate::error::ControllerError;
use chrono::Utc;
use crds::{
    naming, CheckpointReference, ContainerCheckpoint, ContainerCheckpointContent,
    ContainerCheckpointContentSpec, ContainerCheckpointPhase,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Patch, PatchParams, PostParams};
use kube::Resource;
use kube_runtime::controller::Action;
use tracing::{debug, info, warn};

/// Status patch for a terminal failure.
pub(crate) fn checkpoint_failed_patch(message: &str) -> serde_json::Value {
    serde_json::json!({
        "status": {
            "phase": ContainerCheckpointPhase::Failed,
            "message": message,
            "ready": false,
            "completionTime": Utc::now(),
        }
    })
}

/// Status patch binding the content object and completing the checkpoint.
pub(crate) fn checkpoint_succeeded_patch(bound_content_name: &str) -> serde_json::Value {
    serde_json::json!({
        "status": {
            "phase": ContainerCheckpointPhase::Succeeded,
            "message": "done",
            "ready": true,
            "boundContentName": bound_content_name,
            "completionTime": Utc::now(),
        }
    })
}

impl Reconciler {
    pub async fn reconcile_container_checkpoint(
        &self,
        checkpoint: &ContainerCheckpoint,
    ) -> Result<Action, ControllerError> {
        let name = checkpoint
            .metadata
            .name
            .as_ref()
            .ok_or_else(|| ControllerError::MissingObjectKey("ContainerCheckpoint name".into()))?;
        let namespace = checkpoint.metadata.namespace.as_deref().unwrap_or("default");

        let phase = checkpoint
            .status
            .as_ref()
            .map(|status| status.phase.clone())
            .unwrap_or_default();

        info!(
            "Reconciling ContainerCheckpoint {}/{} (phase: {:?})",
            namespace, name, phase
        );

        match phase {
            ContainerCheckpointPhase::Pending => self.container_checkpoint_pending(checkpoint, name).await,
            ContainerCheckpointPhase::Running => {
                self.container_checkpoint_running(checkpoint, name, namespace).await
            }
            // Terminal phases are sticky: no mutations
            ContainerCheckpointPhase::Succeeded | ContainerCheckpointPhase::Failed => {
                debug!("ContainerCheckpoint {}/{} is terminal", namespace, name);
                Ok(Action::await_change())
            }
        }
    }

    /// Pending: validate pod and container, then promote to Running.
    async fn container_checkpoint_pending(
        &self,
        checkpoint: &ContainerCheckpoint,
        name: &str,
    ) -> Result<Action, ControllerError> {
        let pod = match self.pod_api.get(&checkpoint.spec.pod_name).await {
            Ok(pod) => pod,
            Err(err) if is_not_found(&err) => {
                return self.fail_container_checkpoint(name, "pod not found").await;
            }
            Err(err) => return Err(err.into()),
        };

        let container_exists = pod
            .spec
            .as_ref()
            .map(|spec| {
                spec.containers
                    .iter()
                    .any(|container| container.name == checkpoint.spec.container_name)
            })
            .unwrap_or(false);
        if !container_exists {
            return self
                .fail_container_checkpoint(name, "container not found in pod")
                .await;
        }

        if !pod_is_running(&pod) {
            return self.fail_container_checkpoint(name, "pod not running").await;
        }

        let patch = serde_json::json!({
            "status": {
                "phase": ContainerCheckpointPhase::Running,
                "message": "checkpointing container",
            }
        });
        self.container_checkpoint_api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        Ok(Action::requeue(REQUEUE_SHORT))
    }

    /// Running: perform the agent call exactly once, then create and bind
    /// the content object.
    async fn container_checkpoint_running(
        &self,
        checkpoint: &ContainerCheckpoint,
        name: &str,
        namespace: &str,
    ) -> Result<Action, ControllerError> {
        // Bound content means the RPC already succeeded; only finalize.
        let already_bound = checkpoint
            .status
            .as_ref()
            .and_then(|status| status.bound_content_name.as_deref())
            .filter(|bound| !bound.is_empty());
        if let Some(bound) = already_bound {
            debug!(
                "ContainerCheckpoint {}/{} already bound to {}, finalizing",
                namespace, name, bound
            );
            self.container_checkpoint_api
                .patch_status(
                    name,
                    &PatchParams::default(),
                    &Patch::Merge(&checkpoint_succeeded_patch(bound)),
                )
                .await?;
            return Ok(Action::await_change());
        }

        let artifact_uri = match self.perform_container_checkpoint(checkpoint).await {
            Ok(uri) => uri,
            Err(CheckpointCallError::Validation(message)) => {
                return self.fail_container_checkpoint(name, &message).await;
            }
            Err(CheckpointCallError::Agent(err)) => {
                // Deliberately terminal: checkpointing is not free, silent
                // retries can thrash the workload. The parent or user must
                // recreate the object to try again.
                let message = format!("checkpointing failed: {}", err);
                return self.fail_container_checkpoint(name, &message).await;
            }
            Err(CheckpointCallError::Transient(err)) => return Err(err),
        };

        // Content name is a pure function of the checkpoint name, so
        // concurrent reconciles collide at the uniqueness check and exactly
        // one create wins.
        let content_name = naming::container_content_name(name);
        let content = ContainerCheckpointContent {
            metadata: ObjectMeta {
                name: Some(content_name.clone()),
                namespace: Some(namespace.to_string()),
                owner_references: checkpoint.controller_owner_ref(&()).map(|oref| vec![oref]),
                ..Default::default()
            },
            spec: ContainerCheckpointContentSpec {
                container_checkpoint_ref: CheckpointReference::new(namespace, name),
                pod_namespace: namespace.to_string(),
                pod_name: checkpoint.spec.pod_name.clone(),
                container_name: checkpoint.spec.container_name.clone(),
                artifact_uri,
            },
        };

        match self
            .container_content_api
            .create(&PostParams::default(), &content)
            .await
        {
            Ok(_) => {
                info!(
                    "Created ContainerCheckpointContent {}/{}",
                    namespace, content_name
                );
            }
            Err(err) if is_already_exists(&err) => {
                debug!(
                    "ContainerCheckpointContent {}/{} already exists, binding to it",
                    namespace, content_name
                );
            }
            Err(err) => return Err(err.into()),
        }

        // Bind and complete in one status update.
        self.container_checkpoint_api
            .patch_status(
                name,
                &PatchParams::default(),
                &Patch::Merge(&checkpoint_succeeded_patch(&content_name)),
            )
            .await?;

        Ok(Action::await_change())
    }

    /// Resolve the pod's node and UID, then call the agent.
    async fn perform_container_checkpoint(
        &self,
        checkpoint: &ContainerCheckpoint,
    ) -> Result<String, CheckpointCallError> {
        let pod = match self.pod_api.get(&checkpoint.spec.pod_name).await {
            Ok(pod) => pod,
            Err(err) if is_not_found(&err) => {
                return Err(CheckpointCallError::Validation("pod not found".into()));
            }
            Err(err) => return Err(CheckpointCallError::Transient(err.into())),
        };

        let node_name = pod
            .spec
            .as_ref()
            .and_then(|spec| spec.node_name.clone())
            .filter(|node| !node.is_empty());
        let Some(node_name) = node_name else {
            return Err(CheckpointCallError::Validation(format!(
                "pod {} is not scheduled to any node",
                checkpoint.spec.pod_name
            )));
        };

        let pod_uid = pod.metadata.uid.clone().unwrap_or_default();
        let pod_namespace = pod.metadata.namespace.as_deref().unwrap_or("default");

        self.agent
            .checkpoint_container(
                &node_name,
                pod_namespace,
                &checkpoint.spec.pod_name,
                &checkpoint.spec.container_name,
                &pod_uid,
            )
            .await
            .map_err(CheckpointCallError::Agent)
    }

    /// Settle the object in a terminal Failed phase.
    async fn fail_container_checkpoint(
        &self,
        name: &str,
        message: &str,
    ) -> Result<Action, ControllerError> {
        warn!("ContainerCheckpoint {} failed: {}", name, message);
        self.container_checkpoint_api
            .patch_status(
                name,
                &PatchParams::default(),
                &Patch::Merge(&checkpoint_failed_patch(message)),
            )
            .await?;
        Ok(Action::await_change())
    }
}

/// Outcome classification for the agent call path.
enum CheckpointCallError {
    /// Pod/container state makes the checkpoint impossible: terminal Failed
    Validation(String),
    /// Agent reported failure after its own retries: terminal Failed
    Agent(agent_client::AgentError),
    /// Infrastructure error: bubble up and let the watcher requeue
    Transient(ControllerError),
}
