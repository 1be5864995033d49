//! Shared checkpoint store publication
//!
//! Archives are published under a flat filename convention,
//! `<podUID>-<container>-<UTC timestamp>.tar`, into a mount that is
//! identical on every node. The control plane only ever reads a published
//! file after the matching Content object exists, so the Content object is
//! the completion marker; this module's job is durability (fsync after copy).

use crate::error::CheckpointError;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Scheme prefix for artifacts in the shared store
pub const SHARED_SCHEME: &str = "shared://";

/// Scheme prefix for host-local fallback artifacts
pub const FILE_SCHEME: &str = "file://";

/// Filename for a published archive.
pub fn shared_filename(pod_uid: &str, container_name: &str, at: &DateTime<Utc>) -> String {
    format!(
        "{}-{}-{}.tar",
        pod_uid,
        container_name,
        at.format("%Y%m%d-%H%M%S")
    )
}

/// Copy a local archive into the shared store and fsync it.
///
/// Returns the published filename (the `shared://` URI is the filename with
/// the scheme prefixed). The copy is retried once before giving up; the
/// caller falls back to a `file://` URI on failure.
pub async fn publish(
    shared_mount: &Path,
    pod_uid: &str,
    container_name: &str,
    local_path: &Path,
) -> Result<String, CheckpointError> {
    let filename = shared_filename(pod_uid, container_name, &Utc::now());
    let dest = shared_mount.join(&filename);

    if let Err(err) = copy_and_sync(local_path, &dest).await {
        warn!("Shared store publish failed, retrying once: {}", err);
        copy_and_sync(local_path, &dest).await?;
    }

    Ok(filename)
}

async fn copy_and_sync(src: &Path, dest: &Path) -> Result<(), CheckpointError> {
    tokio::fs::copy(src, dest).await?;
    let file = tokio::fs::File::open(dest).await?;
    file.sync_all().await?;
    Ok(())
}

/// Resolve a checkpoint URI to a local path on this node.
///
/// `shared://<filename>` resolves under the shared mount; `file://<path>`
/// and bare paths are used as-is.
pub fn resolve_checkpoint_path(shared_mount: &Path, uri: &str) -> PathBuf {
    if let Some(filename) = uri.strip_prefix(SHARED_SCHEME) {
        shared_mount.join(filename)
    } else if let Some(path) = uri.strip_prefix(FILE_SCHEME) {
        PathBuf::from(path)
    } else {
        PathBuf::from(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn filename_encodes_uid_container_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap();
        assert_eq!(
            shared_filename("abc-123", "web", &at),
            "abc-123-web-20250314-150926.tar"
        );
    }

    #[test]
    fn resolve_shared_uri_joins_mount() {
        let path = resolve_checkpoint_path(Path::new("/mnt/checkpoints"), "shared://a-b-ts.tar");
        assert_eq!(path, PathBuf::from("/mnt/checkpoints/a-b-ts.tar"));
    }

    #[test]
    fn resolve_file_uri_strips_scheme() {
        let path = resolve_checkpoint_path(Path::new("/mnt/checkpoints"), "file:///tmp/a.tar");
        assert_eq!(path, PathBuf::from("/tmp/a.tar"));
    }

    #[test]
    fn resolve_bare_path_passes_through() {
        let path = resolve_checkpoint_path(Path::new("/mnt/checkpoints"), "/tmp/a.tar");
        assert_eq!(path, PathBuf::from("/tmp/a.tar"));
    }

    #[tokio::test]
    async fn publish_copies_into_shared_mount() {
        let shared = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let archive = local.path().join("checkpoint.tar");
        tokio::fs::write(&archive, b"archive-bytes").await.unwrap();

        let filename = publish(shared.path(), "uid-1", "app", &archive)
            .await
            .unwrap();

        assert!(filename.starts_with("uid-1-app-"));
        assert!(filename.ends_with(".tar"));
        let published = tokio::fs::read(shared.path().join(&filename)).await.unwrap();
        assert_eq!(published, b"archive-bytes");
    }

    #[tokio::test]
    async fn publish_fails_when_mount_is_absent() {
        let local = tempfile::tempdir().unwrap();
        let archive = local.path().join("checkpoint.tar");
        tokio::fs::write(&archive, b"archive-bytes").await.unwrap();

        let missing = local.path().join("no-such-mount");
        let result = publish(&missing, "uid-1", "app", &archive).await;
        assert!(result.is_err());
    }
}
