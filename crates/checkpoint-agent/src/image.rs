//! Checkpoint archive to image packaging
//!
//! Builds a single-layer image from scratch with the archive at the root and
//! the checkpoint annotation set, so CRI-O recognizes the image as a
//! checkpoint and takes the restore path when a pod references it.

use crate::error::CheckpointError;
use crate::storage;
use std::path::Path;
use tokio::process::Command;
use tracing::{info, warn};

/// Container storage root shared with the host runtime
const STORAGE_ROOT: &str = "/var/lib/containers/storage";

/// Annotation key CRI-O inspects to pick the container to restore
const CHECKPOINT_ANNOTATION: &str = "io.kubernetes.cri-o.annotations.checkpoint.name";

/// Package a published checkpoint archive as an image under `image_name`.
///
/// The working container is removed on every exit path.
pub async fn package_as_image(
    shared_mount: &Path,
    checkpoint_uri: &str,
    container_name: &str,
    image_name: &str,
) -> Result<String, CheckpointError> {
    let archive = storage::resolve_checkpoint_path(shared_mount, checkpoint_uri);
    if !archive.exists() {
        return Err(CheckpointError::ArchiveNotFound(
            archive.display().to_string(),
        ));
    }

    info!(
        "Packaging checkpoint {} as image {}",
        archive.display(),
        image_name
    );

    let container_id = buildah(&["from", "scratch"]).await?;
    let container_id = container_id.trim().to_string();

    let result = build_layers(&container_id, &archive, container_name, image_name).await;

    // Remove the working container whether or not the build succeeded.
    if let Err(err) = buildah(&["rm", &container_id]).await {
        warn!(
            "Failed to remove working container {}: {}",
            container_id, err
        );
    }

    result?;
    info!("Committed checkpoint image {}", image_name);
    Ok(image_name.to_string())
}

async fn build_layers(
    container_id: &str,
    archive: &Path,
    container_name: &str,
    image_name: &str,
) -> Result<(), CheckpointError> {
    let archive_path = archive.display().to_string();
    buildah(&["add", container_id, &archive_path, "/"]).await?;

    let annotation = format!("--annotation={}={}", CHECKPOINT_ANNOTATION, container_name);
    buildah(&["config", &annotation, container_id]).await?;

    buildah(&["commit", container_id, image_name]).await?;
    Ok(())
}

/// Run one buildah command against the shared storage root. Returns stdout.
async fn buildah(args: &[&str]) -> Result<String, CheckpointError> {
    let output = Command::new("buildah")
        .args(["--root", STORAGE_ROOT])
        .args(args)
        .output()
        .await?;

    if !output.status.success() {
        return Err(CheckpointError::Packaging(format!(
            "buildah {} failed: {}",
            args.first().unwrap_or(&""),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
