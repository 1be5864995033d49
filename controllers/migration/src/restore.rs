//! Restored pod construction
//!
//! Builds the manifest for the pod that materializes a checkpoint on the
//! target node. Containers reference their checkpoint archives as images;
//! the host runtime detects the archive and takes the restore path instead
//! of pulling. Everything here is pure so the whole construction is testable
//! without a cluster.

use crds::{naming, ContainerCheckpointContent, PodCheckpointContent, PodMigration};
use k8s_openapi::api::core::v1::{Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Annotation carrying the source pod name
pub const ANNOTATION_SOURCE_POD: &str = "migration.source-pod";
/// Annotation carrying the requested target node
pub const ANNOTATION_TARGET_NODE: &str = "migration.target-node";
/// Annotation carrying the PodCheckpointContent the pod was restored from
pub const ANNOTATION_CHECKPOINT_SOURCE: &str = "migration.checkpoint-source";

#[derive(Debug, Error)]
pub enum RestoreError {
    /// A container of the source pod has no checkpoint content
    #[error("no checkpoint found for container {0}")]
    MissingCheckpoint(String),

    /// Artifact URI uses a scheme the restore path cannot resolve
    #[error("unsupported checkpoint path format: {0}")]
    UnsupportedScheme(String),

    /// Source pod carries no spec (never expected from the API server)
    #[error("source pod {0} has no spec")]
    MissingPodSpec(String),
}

/// Resolve an artifact URI to the path the target node sees.
///
/// `shared://<filename>` resolves under the shared mount (identical on every
/// node); `file://<path>` passes through; anything else is an error.
pub fn resolve_artifact_path(artifact_uri: &str, shared_mount: &Path) -> Result<String, RestoreError> {
    if let Some(filename) = artifact_uri.strip_prefix("shared://") {
        Ok(shared_mount.join(filename).display().to_string())
    } else if let Some(path) = artifact_uri.strip_prefix("file://") {
        Ok(path.to_string())
    } else {
        Err(RestoreError::UnsupportedScheme(artifact_uri.to_string()))
    }
}

/// Build the restored pod manifest.
///
/// Preserves the source pod's service account, security context, volumes,
/// labels, and full per-container configuration; rewrites each container's
/// image to its resolved archive path with pulls disabled; never restarts on
/// exit so a failed restore surfaces as Failed instead of looping.
pub fn build_restored_pod(
    migration: &PodMigration,
    source_pod: &Pod,
    checkpoint_content: &PodCheckpointContent,
    container_contents: &[ContainerCheckpointContent],
    shared_mount: &Path,
) -> Result<Pod, RestoreError> {
    let source_name = source_pod
        .metadata
        .name
        .clone()
        .unwrap_or_else(|| migration.spec.pod_name.clone());
    let source_spec = source_pod
        .spec
        .as_ref()
        .ok_or_else(|| RestoreError::MissingPodSpec(source_name.clone()))?;

    let mut containers = Vec::with_capacity(source_spec.containers.len());
    for container in &source_spec.containers {
        let content = container_contents
            .iter()
            .find(|content| content.spec.container_name == container.name)
            .ok_or_else(|| RestoreError::MissingCheckpoint(container.name.clone()))?;

        let image_path = resolve_artifact_path(&content.spec.artifact_uri, shared_mount)?;

        let mut restored = container.clone();
        restored.image = Some(image_path);
        restored.image_pull_policy = Some("Never".to_string());
        containers.push(restored);
    }

    let mut annotations = BTreeMap::new();
    annotations.insert(ANNOTATION_SOURCE_POD.to_string(), source_name.clone());
    annotations.insert(
        ANNOTATION_TARGET_NODE.to_string(),
        migration.spec.target_node.clone(),
    );
    annotations.insert(
        ANNOTATION_CHECKPOINT_SOURCE.to_string(),
        checkpoint_content
            .metadata
            .name
            .clone()
            .unwrap_or_default(),
    );

    // Empty target node delegates placement to the scheduler.
    let node_name = if migration.spec.target_node.is_empty() {
        None
    } else {
        Some(migration.spec.target_node.clone())
    };

    Ok(Pod {
        metadata: ObjectMeta {
            name: Some(naming::restored_pod_name(&source_name)),
            namespace: source_pod.metadata.namespace.clone(),
            labels: source_pod.metadata.labels.clone(),
            annotations: Some(annotations),
            owner_references: migration.controller_owner_ref(&()).map(|oref| vec![oref]),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name,
            restart_policy: Some("Never".to_string()),
            service_account_name: source_spec.service_account_name.clone(),
            security_context: source_spec.security_context.clone(),
            volumes: source_spec.volumes.clone(),
            containers,
            ..Default::default()
        }),
        status: None,
    })
}
