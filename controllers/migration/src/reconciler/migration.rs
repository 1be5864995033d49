//! PodMigration reconciler
//!
//! End-to-end orchestration: validate the source, spawn a PodCheckpoint,
//! wait for it, materialize the restored pod on the target node, delete the
//! source once the restore is running.

use super::{is_already_exists, is_not_found, pod_is_running, pod_phase, Reconciler, REQUEUE_RESTORE, REQUEUE_SHORT};
use crate::error::ControllerError;
use crate::restore;
use crds::{
    naming, ContainerCheckpointContent, PodCheckpoint, PodCheckpointContent, PodCheckpointPhase,
    PodCheckpointSpec, PodMigration, PodMigrationPhase,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::Resource;
use kube_runtime::controller::Action;
use tracing::{debug, error, info, warn};

impl Reconciler {
    pub async fn reconcile_migration(
        &self,
        migration: &PodMigration,
    ) -> Result<Action, ControllerError> {
        let name = migration
            .metadata
            .name
            .as_ref()
            .ok_or_else(|| ControllerError::MissingObjectKey("PodMigration name".into()))?;
        let namespace = migration.metadata.namespace.as_deref().unwrap_or("default");

        let phase = migration
            .status
            .as_ref()
            .map(|status| status.phase.clone())
            .unwrap_or_default();

        info!(
            "Reconciling PodMigration {}/{} (phase: {:?})",
            namespace, name, phase
        );

        match phase {
            PodMigrationPhase::Pending => self.migration_pending(migration, name, namespace).await,
            PodMigrationPhase::Checkpointing => {
                self.migration_checkpointing(migration, name, namespace).await
            }
            PodMigrationPhase::CheckpointComplete => {
                self.migration_checkpoint_complete(migration, name, namespace).await
            }
            PodMigrationPhase::Restoring => self.migration_restoring(migration, name).await,
            PodMigrationPhase::Succeeded | PodMigrationPhase::Failed => {
                debug!("PodMigration {}/{} is terminal", namespace, name);
                Ok(Action::await_change())
            }
        }
    }

    /// Pending: validate the source pod and target node, then spawn the
    /// PodCheckpoint.
    async fn migration_pending(
        &self,
        migration: &PodMigration,
        name: &str,
        namespace: &str,
    ) -> Result<Action, ControllerError> {
        let pod = match self.pod_api.get(&migration.spec.pod_name).await {
            Ok(pod) => pod,
            Err(err) if is_not_found(&err) => {
                return self.fail_migration(name, "source pod not found").await;
            }
            Err(err) => return Err(err.into()),
        };

        if !pod_is_running(&pod) {
            return self.fail_migration(name, "source pod not running").await;
        }

        // Empty target node is allowed: the scheduler places the restored pod.
        if !migration.spec.target_node.is_empty() {
            match self.node_api.get(&migration.spec.target_node).await {
                Ok(_) => {}
                Err(err) if is_not_found(&err) => {
                    return self.fail_migration(name, "target node not found").await;
                }
                Err(err) => return Err(err.into()),
            }
        }

        let checkpoint_name = naming::pod_checkpoint_name(name);
        let created = self
            .ensure_pod_checkpoint(migration, &checkpoint_name, namespace)
            .await?;

        let message = if created {
            "checkpoint requested"
        } else {
            "checkpoint in progress"
        };
        let patch = serde_json::json!({
            "status": {
                "phase": PodMigrationPhase::Checkpointing,
                "message": message,
                "podCheckpointRef": {"name": checkpoint_name},
            }
        });
        self.migration_api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        // requeue soon to start monitoring
        Ok(Action::requeue(REQUEUE_SHORT))
    }

    /// Checkpointing: follow the referenced PodCheckpoint.
    async fn migration_checkpointing(
        &self,
        migration: &PodMigration,
        name: &str,
        namespace: &str,
    ) -> Result<Action, ControllerError> {
        // Status ref if set, else fall back to the deterministic name.
        let checkpoint_name = migration
            .status
            .as_ref()
            .and_then(|status| status.pod_checkpoint_ref.as_ref())
            .map(|reference| reference.name.clone())
            .unwrap_or_else(|| naming::pod_checkpoint_name(name));

        let pod_checkpoint = match self.pod_checkpoint_api.get(&checkpoint_name).await {
            Ok(checkpoint) => checkpoint,
            Err(err) if is_not_found(&err) => {
                // The checkpoint vanished (operator deletion, crash before
                // create landed); re-create it and keep watching.
                warn!(
                    "PodCheckpoint {}/{} missing, re-creating",
                    namespace, checkpoint_name
                );
                self.ensure_pod_checkpoint(migration, &checkpoint_name, namespace)
                    .await?;
                return Ok(Action::requeue(REQUEUE_SHORT));
            }
            Err(err) => return Err(err.into()),
        };

        let status = pod_checkpoint.status.clone().unwrap_or_default();
        match status.phase {
            PodCheckpointPhase::Failed => {
                let message = format!(
                    "checkpoint failed: {}",
                    status.message.unwrap_or_default()
                );
                self.fail_migration(name, &message).await
            }
            PodCheckpointPhase::Succeeded if status.ready => {
                let patch = serde_json::json!({
                    "status": {
                        "phase": PodMigrationPhase::CheckpointComplete,
                        "message": "checkpoint complete",
                    }
                });
                self.migration_api
                    .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?;
                Ok(Action::requeue(REQUEUE_SHORT))
            }
            _ => {
                debug!(
                    "Checkpoint {}/{} in progress (phase: {:?})",
                    namespace, checkpoint_name, status.phase
                );
                Ok(Action::requeue(REQUEUE_SHORT))
            }
        }
    }

    /// CheckpointComplete: materialize the restored pod.
    async fn migration_checkpoint_complete(
        &self,
        migration: &PodMigration,
        name: &str,
        namespace: &str,
    ) -> Result<Action, ControllerError> {
        let restored_pod = match self.build_restored_pod(migration, name, namespace).await {
            Ok(pod) => pod,
            Err(BuildRestoredPodError::Validation(message)) => {
                let message = format!("failed to create restored pod: {}", message);
                return self.fail_migration(name, &message).await;
            }
            Err(BuildRestoredPodError::Transient(err)) => return Err(err),
        };

        let restored_name = restored_pod
            .metadata
            .name
            .clone()
            .unwrap_or_else(|| naming::restored_pod_name(&migration.spec.pod_name));

        match self.pod_api.create(&PostParams::default(), &restored_pod).await {
            Ok(_) => info!("Restored pod {}/{} created", namespace, restored_name),
            Err(err) if is_already_exists(&err) => {
                info!("Restored pod {}/{} already exists", namespace, restored_name);
            }
            Err(err) => {
                let message = format!("failed to create restored pod: {}", err);
                return self.fail_migration(name, &message).await;
            }
        }

        let patch = serde_json::json!({
            "status": {
                "phase": PodMigrationPhase::Restoring,
                "message": "restored pod created",
                "restoredPodName": restored_name,
            }
        });
        self.migration_api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        Ok(Action::requeue(REQUEUE_RESTORE))
    }

    /// Restoring: wait for the restored pod to run, then delete the source.
    async fn migration_restoring(
        &self,
        migration: &PodMigration,
        name: &str,
    ) -> Result<Action, ControllerError> {
        let restored_name = migration
            .status
            .as_ref()
            .and_then(|status| status.restored_pod_name.clone())
            .filter(|restored| !restored.is_empty());
        let Some(restored_name) = restored_name else {
            return self
                .fail_migration(name, "no restored pod name in status")
                .await;
        };

        let restored_pod = match self.pod_api.get(&restored_name).await {
            Ok(pod) => pod,
            Err(err) if is_not_found(&err) => {
                return self.fail_migration(name, "restored pod not found").await;
            }
            Err(err) => return Err(err.into()),
        };

        match pod_phase(&restored_pod) {
            Some("Running") => {
                // Delete the source pod; failure to delete does not fail the
                // migration.
                if let Err(err) = self.delete_source_pod(&migration.spec.pod_name).await {
                    error!(
                        "Failed to delete original pod {}, but migration succeeded: {}",
                        migration.spec.pod_name, err
                    );
                }
                let patch = serde_json::json!({
                    "status": {
                        "phase": PodMigrationPhase::Succeeded,
                        "message": "pod successfully restored and running",
                    }
                });
                self.migration_api
                    .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?;
                info!("PodMigration {} succeeded", name);
                Ok(Action::await_change())
            }
            Some("Failed") => {
                self.fail_migration(name, "restored pod failed to start")
                    .await
            }
            other => {
                debug!(
                    "Restored pod {} in progress (phase: {:?})",
                    restored_name, other
                );
                Ok(Action::requeue(REQUEUE_RESTORE))
            }
        }
    }

    /// Idempotently create the PodCheckpoint owned by this migration.
    /// Returns true when a new object was created.
    async fn ensure_pod_checkpoint(
        &self,
        migration: &PodMigration,
        checkpoint_name: &str,
        namespace: &str,
    ) -> Result<bool, ControllerError> {
        match self.pod_checkpoint_api.get(checkpoint_name).await {
            Ok(_) => return Ok(false),
            Err(err) if is_not_found(&err) => {}
            Err(err) => return Err(err.into()),
        }

        let checkpoint = PodCheckpoint {
            metadata: ObjectMeta {
                name: Some(checkpoint_name.to_string()),
                namespace: Some(namespace.to_string()),
                owner_references: migration.controller_owner_ref(&()).map(|oref| vec![oref]),
                ..Default::default()
            },
            spec: PodCheckpointSpec {
                pod_name: migration.spec.pod_name.clone(),
            },
            status: None,
        };

        match self
            .pod_checkpoint_api
            .create(&PostParams::default(), &checkpoint)
            .await
        {
            Ok(_) => {
                info!("Created PodCheckpoint {}/{}", namespace, checkpoint_name);
                Ok(true)
            }
            Err(err) if is_already_exists(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Load everything the restored pod needs and construct its manifest.
    async fn build_restored_pod(
        &self,
        migration: &PodMigration,
        name: &str,
        namespace: &str,
    ) -> Result<k8s_openapi::api::core::v1::Pod, BuildRestoredPodError> {
        let source_pod = match self.pod_api.get(&migration.spec.pod_name).await {
            Ok(pod) => pod,
            Err(err) if is_not_found(&err) => {
                return Err(BuildRestoredPodError::Validation(
                    "source pod not found".into(),
                ));
            }
            Err(err) => return Err(BuildRestoredPodError::Transient(err.into())),
        };

        let content = self.load_checkpoint_content(migration, name).await?;
        let container_contents = self.load_container_contents(&content).await?;

        restore::build_restored_pod(
            migration,
            &source_pod,
            &content,
            &container_contents,
            &self.shared_mount,
        )
        .map_err(|err| BuildRestoredPodError::Validation(err.to_string()))
    }

    /// Follow Migration → PodCheckpoint → PodCheckpointContent.
    async fn load_checkpoint_content(
        &self,
        migration: &PodMigration,
        name: &str,
    ) -> Result<PodCheckpointContent, BuildRestoredPodError> {
        let checkpoint_name = migration
            .status
            .as_ref()
            .and_then(|status| status.pod_checkpoint_ref.as_ref())
            .map(|reference| reference.name.clone())
            .unwrap_or_else(|| naming::pod_checkpoint_name(name));

        let pod_checkpoint = match self.pod_checkpoint_api.get(&checkpoint_name).await {
            Ok(checkpoint) => checkpoint,
            Err(err) if is_not_found(&err) => {
                return Err(BuildRestoredPodError::Validation(format!(
                    "pod checkpoint {} not found",
                    checkpoint_name
                )));
            }
            Err(err) => return Err(BuildRestoredPodError::Transient(err.into())),
        };

        let bound = pod_checkpoint
            .status
            .as_ref()
            .and_then(|status| status.bound_content_name.clone())
            .filter(|bound| !bound.is_empty());
        let Some(bound) = bound else {
            return Err(BuildRestoredPodError::Validation(
                "checkpoint has no bound content".into(),
            ));
        };

        match self.pod_content_api.get(&bound).await {
            Ok(content) => Ok(content),
            Err(err) if is_not_found(&err) => Err(BuildRestoredPodError::Validation(format!(
                "checkpoint content {} not found",
                bound
            ))),
            Err(err) => Err(BuildRestoredPodError::Transient(err.into())),
        }
    }

    /// Fetch every ContainerCheckpointContent the aggregate references.
    async fn load_container_contents(
        &self,
        content: &PodCheckpointContent,
    ) -> Result<Vec<ContainerCheckpointContent>, BuildRestoredPodError> {
        let mut contents = Vec::with_capacity(content.spec.container_contents.len());
        for reference in &content.spec.container_contents {
            match self.container_content_api.get(&reference.name).await {
                Ok(container_content) => contents.push(container_content),
                Err(err) if is_not_found(&err) => {
                    return Err(BuildRestoredPodError::Validation(format!(
                        "container checkpoint content {} not found",
                        reference.name
                    )));
                }
                Err(err) => return Err(BuildRestoredPodError::Transient(err.into())),
            }
        }
        Ok(contents)
    }

    /// Best-effort deletion of the source pod. Absence counts as success.
    async fn delete_source_pod(&self, pod_name: &str) -> Result<(), ControllerError> {
        match self.pod_api.delete(pod_name, &DeleteParams::default()).await {
            Ok(_) => {
                info!("Deleted original pod {}", pod_name);
                Ok(())
            }
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Settle the migration in a terminal Failed phase.
    async fn fail_migration(&self, name: &str, message: &str) -> Result<Action, ControllerError> {
        warn!("PodMigration {} failed: {}", name, message);
        let patch = serde_json::json!({
            "status": {
                "phase": PodMigrationPhase::Failed,
                "message": message,
            }
        });
        self.migration_api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(Action::await_change())
    }
}

/// Outcome classification for restored-pod construction.
enum BuildRestoredPodError {
    /// Missing prerequisite: terminal Failed with the message
    Validation(String),
    /// Infrastructure error: bubble up and requeue
    Transient(ControllerError),
}
