//! PodCheckpoint reconciler
//!
//! Fans out one ContainerCheckpoint per container of the target pod, then
//! fans their results back in. The parent only advances once the whole child
//! set is terminal; completion order is irrelevant.

use super::{is_already_exists, is_not_found, pod_is_running, Reconciler, REQUEUE_SHORT};
use crate::error::ControllerError;
use chrono::Utc;
use crds::{
    naming, CheckpointReference, ContainerCheckpoint, ContainerCheckpointPhase,
    ContainerCheckpointSpec, LocalReference, PodCheckpoint, PodCheckpointContent,
    PodCheckpointContentSpec, PodCheckpointPhase,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::Resource;
use kube_runtime::controller::Action;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Fan-in verdict over a PodCheckpoint's children
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FanIn {
    /// At least one child is still working (or succeeded without content)
    InProgress,
    /// At least one child failed; the parent must fail
    ChildFailed,
    /// Every child succeeded with bound content (names sorted for
    /// deterministic aggregation)
    Complete(Vec<String>),
}

/// Evaluate the child set.
///
/// A child that reports Succeeded without a bound content name is treated as
/// in-progress: its reconciler binds content and succeeds in one update, so
/// the gap only exists mid-update.
pub(crate) fn evaluate_children(children: &[ContainerCheckpoint]) -> FanIn {
    let mut contents = Vec::new();
    let mut in_progress = false;

    for child in children {
        let status = child.status.as_ref();
        let phase = status.map(|s| s.phase.clone()).unwrap_or_default();
        match phase {
            ContainerCheckpointPhase::Failed => return FanIn::ChildFailed,
            ContainerCheckpointPhase::Succeeded => {
                match status.and_then(|s| s.bound_content_name.clone()) {
                    Some(bound) if !bound.is_empty() => contents.push(bound),
                    _ => in_progress = true,
                }
            }
            ContainerCheckpointPhase::Pending | ContainerCheckpointPhase::Running => {
                in_progress = true;
            }
        }
    }

    if in_progress {
        FanIn::InProgress
    } else {
        contents.sort();
        FanIn::Complete(contents)
    }
}

impl Reconciler {
    pub async fn reconcile_pod_checkpoint(
        &self,
        pod_checkpoint: &PodCheckpoint,
    ) -> Result<Action, ControllerError> {
        let name = pod_checkpoint
            .metadata
            .name
            .as_ref()
            .ok_or_else(|| ControllerError::MissingObjectKey("PodCheckpoint name".into()))?;
        let namespace = pod_checkpoint
            .metadata
            .namespace
            .as_deref()
            .unwrap_or("default");

        let phase = pod_checkpoint
            .status
            .as_ref()
            .map(|status| status.phase.clone())
            .unwrap_or_default();

        info!(
            "Reconciling PodCheckpoint {}/{} (phase: {:?})",
            namespace, name, phase
        );

        match phase {
            PodCheckpointPhase::Pending => self.pod_checkpoint_pending(pod_checkpoint, name, namespace).await,
            PodCheckpointPhase::Running => self.pod_checkpoint_running(pod_checkpoint, name, namespace).await,
            PodCheckpointPhase::Succeeded | PodCheckpointPhase::Failed => {
                debug!("PodCheckpoint {}/{} is terminal", namespace, name);
                Ok(Action::await_change())
            }
        }
    }

    /// Pending: validate the pod and idempotently create the child set.
    async fn pod_checkpoint_pending(
        &self,
        pod_checkpoint: &PodCheckpoint,
        name: &str,
        namespace: &str,
    ) -> Result<Action, ControllerError> {
        let pod = match self.pod_api.get(&pod_checkpoint.spec.pod_name).await {
            Ok(pod) => pod,
            Err(err) if is_not_found(&err) => {
                return self.fail_pod_checkpoint(name, "source pod not found").await;
            }
            Err(err) => return Err(err.into()),
        };

        if !pod_is_running(&pod) {
            return self
                .fail_pod_checkpoint(name, "source pod not running")
                .await;
        }

        // One ContainerCheckpoint per container, deterministic name, parent
        // label, owned by this object. Creation collisions mean another
        // reconcile got there first.
        let containers = pod
            .spec
            .as_ref()
            .map(|spec| spec.containers.as_slice())
            .unwrap_or_default();
        for container in containers {
            let child_name = naming::container_checkpoint_name(name, &container.name);
            match self.container_checkpoint_api.get(&child_name).await {
                Ok(_) => continue,
                Err(err) if is_not_found(&err) => {}
                Err(err) => return Err(err.into()),
            }

            let mut labels = BTreeMap::new();
            labels.insert(naming::PARENT_LABEL.to_string(), name.to_string());

            let child = ContainerCheckpoint {
                metadata: ObjectMeta {
                    name: Some(child_name.clone()),
                    namespace: Some(namespace.to_string()),
                    labels: Some(labels),
                    owner_references: pod_checkpoint
                        .controller_owner_ref(&())
                        .map(|oref| vec![oref]),
                    ..Default::default()
                },
                spec: ContainerCheckpointSpec {
                    pod_name: pod_checkpoint.spec.pod_name.clone(),
                    container_name: container.name.clone(),
                },
                status: None,
            };

            match self
                .container_checkpoint_api
                .create(&PostParams::default(), &child)
                .await
            {
                Ok(_) => info!("Created ContainerCheckpoint {}/{}", namespace, child_name),
                Err(err) if is_already_exists(&err) => {
                    debug!(
                        "ContainerCheckpoint {}/{} created concurrently",
                        namespace, child_name
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        let patch = serde_json::json!({
            "status": {
                "phase": PodCheckpointPhase::Running,
                "message": "checkpointing containers",
                "creationTime": Utc::now(),
            }
        });
        self.pod_checkpoint_api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        Ok(Action::requeue(REQUEUE_SHORT))
    }

    /// Running: fan in the children, then aggregate into a
    /// PodCheckpointContent and complete.
    async fn pod_checkpoint_running(
        &self,
        pod_checkpoint: &PodCheckpoint,
        name: &str,
        namespace: &str,
    ) -> Result<Action, ControllerError> {
        let selector = format!("{}={}", naming::PARENT_LABEL, name);
        let children = self
            .container_checkpoint_api
            .list(&ListParams::default().labels(&selector))
            .await?;

        // A race after Pending can leave the set empty; re-run the pending
        // handler defensively to (re)create children.
        if children.items.is_empty() {
            debug!(
                "No ContainerCheckpoints found for {}/{}; re-invoking pending handler",
                namespace, name
            );
            return self.pod_checkpoint_pending(pod_checkpoint, name, namespace).await;
        }

        let contents = match evaluate_children(&children.items) {
            FanIn::InProgress => return Ok(Action::requeue(REQUEUE_SHORT)),
            FanIn::ChildFailed => {
                return self
                    .fail_pod_checkpoint(
                        name,
                        "one or more containers failed (see ContainerCheckpoint statuses)",
                    )
                    .await;
            }
            FanIn::Complete(contents) => contents,
        };

        // Ensure the aggregate content exists and is bound before completing.
        let bound = pod_checkpoint
            .status
            .as_ref()
            .and_then(|status| status.bound_content_name.clone())
            .filter(|bound| !bound.is_empty());

        let Some(bound_name) = bound else {
            let content_name = naming::pod_content_name(name);
            match self.pod_content_api.get(&content_name).await {
                Ok(_) => {
                    // record binding
                    let patch = serde_json::json!({
                        "status": {"boundContentName": content_name}
                    });
                    self.pod_checkpoint_api
                        .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                        .await?;
                    return Ok(Action::requeue(REQUEUE_SHORT));
                }
                Err(err) if is_not_found(&err) => {}
                Err(err) => return Err(err.into()),
            }

            let content = PodCheckpointContent {
                metadata: ObjectMeta {
                    name: Some(content_name.clone()),
                    namespace: Some(namespace.to_string()),
                    owner_references: pod_checkpoint
                        .controller_owner_ref(&())
                        .map(|oref| vec![oref]),
                    ..Default::default()
                },
                spec: PodCheckpointContentSpec {
                    pod_checkpoint_ref: CheckpointReference::new(namespace, name),
                    pod_namespace: namespace.to_string(),
                    pod_name: pod_checkpoint.spec.pod_name.clone(),
                    container_contents: contents.into_iter().map(LocalReference::new).collect(),
                },
                status: None,
            };
            match self
                .pod_content_api
                .create(&PostParams::default(), &content)
                .await
            {
                Ok(_) => info!("Created PodCheckpointContent {}/{}", namespace, content_name),
                Err(err) if is_already_exists(&err) => {
                    debug!(
                        "PodCheckpointContent {}/{} created concurrently",
                        namespace, content_name
                    );
                }
                Err(err) => return Err(err.into()),
            }
            return Ok(Action::requeue(REQUEUE_SHORT));
        };

        // Confirm the bound content is ready; this reconciler marks it ready
        // itself rather than waiting on an out-of-band controller.
        let content = match self.pod_content_api.get(&bound_name).await {
            Ok(content) => content,
            Err(err) if is_not_found(&err) => return Ok(Action::requeue(REQUEUE_SHORT)),
            Err(err) => return Err(err.into()),
        };

        let content_ready = content.status.as_ref().map(|s| s.ready).unwrap_or(false);
        if !content_ready {
            let patch = serde_json::json!({
                "status": {"ready": true, "creationTime": Utc::now()}
            });
            self.pod_content_api
                .patch_status(&bound_name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?;
        }

        let patch = serde_json::json!({
            "status": {
                "phase": PodCheckpointPhase::Succeeded,
                "message": "checkpoint complete",
                "ready": true,
                "boundContentName": bound_name,
                "completionTime": Utc::now(),
            }
        });
        self.pod_checkpoint_api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        info!("PodCheckpoint {}/{} complete", namespace, name);
        Ok(Action::await_change())
    }

    /// Settle the object in a terminal Failed phase.
    async fn fail_pod_checkpoint(
        &self,
        name: &str,
        message: &str,
    ) -> Result<Action, ControllerError> {
        warn!("PodCheckpoint {} failed: {}", name, message);
        let patch = serde_json::json!({
            "status": {
                "phase": PodCheckpointPhase::Failed,
                "message": message,
                "ready": false,
                "completionTime": Utc::now(),
            }
        });
        self.pod_checkpoint_api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(Action::await_change())
    }
}
