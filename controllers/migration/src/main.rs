//! Migration Controller
//!
//! Unified controller for the live pod migration CRDs:
//! - PodMigration: end-to-end orchestration (checkpoint, restore, cleanup)
//! - PodCheckpoint: fan-out/fan-in over a pod's containers
//! - ContainerCheckpoint: drives a single container checkpoint via the
//!   node-local agent
//!
//! The restored pod references checkpoint archives as its container images;
//! the host runtime on the target node detects them and takes the restore
//! path.

mod controller;
mod error;
mod reconciler;
mod restore;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::controller::Controller;
use crate::error::ControllerError;
use std::env;
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting Migration Controller");

    // Load configuration from environment variables
    let namespace = env::var("WATCH_NAMESPACE").ok();
    let agent_port = env::var("AGENT_PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(50051u16);
    let shared_mount = env::var("SHARED_MOUNT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/mnt/checkpoints"));

    info!("Configuration:");
    info!(
        "  Namespace: {}",
        namespace.as_deref().unwrap_or("default")
    );
    info!("  Agent port: {}", agent_port);
    info!("  Shared mount: {}", shared_mount.display());

    // Initialize and run controller
    let controller = Controller::new(namespace, agent_port, shared_mount).await?;
    controller.run().await?;

    Ok(())
}
