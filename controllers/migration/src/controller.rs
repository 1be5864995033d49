//! Main controller implementation.
//!
//! This module contains the `Controller` struct that orchestrates
//! reconciliation and resource watching for the migration control plane.
//!
//! The controller manages three CRD types:
//! - PodMigration: end-to-end migration orchestration
//! - PodCheckpoint: per-pod checkpoint fan-out/fan-in
//! - ContainerCheckpoint: per-container checkpoint via the node agent

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use agent_client::AgentClient;
use crds::{ContainerCheckpoint, ContainerCheckpointContent, PodCheckpoint, PodCheckpointContent, PodMigration};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::{Api, Client};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for pod migration management.
pub struct Controller {
    migration_watcher: JoinHandle<Result<(), ControllerError>>,
    pod_checkpoint_watcher: JoinHandle<Result<(), ControllerError>>,
    container_checkpoint_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(
        namespace: Option<String>,
        agent_port: u16,
        shared_mount: PathBuf,
    ) -> Result<Self, ControllerError> {
        info!("Initializing Migration Controller");

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;

        // Create agent client (dials the checkpoint agent on a pod's node)
        let agent_client = AgentClient::new(kube_client.clone(), agent_port);

        // Create API clients for all resource types
        let ns = namespace.as_deref().unwrap_or("default");
        let pod_api: Api<Pod> = Api::namespaced(kube_client.clone(), ns);
        let node_api: Api<Node> = Api::all(kube_client.clone());
        let migration_api: Api<PodMigration> = Api::namespaced(kube_client.clone(), ns);
        let pod_checkpoint_api: Api<PodCheckpoint> = Api::namespaced(kube_client.clone(), ns);
        let container_checkpoint_api: Api<ContainerCheckpoint> =
            Api::namespaced(kube_client.clone(), ns);
        let container_content_api: Api<ContainerCheckpointContent> =
            Api::namespaced(kube_client.clone(), ns);
        let pod_content_api: Api<PodCheckpointContent> = Api::namespaced(kube_client.clone(), ns);

        // Create reconciler
        let reconciler = Arc::new(Reconciler::new(
            Box::new(agent_client),
            pod_api,
            node_api,
            migration_api.clone(),
            pod_checkpoint_api.clone(),
            container_checkpoint_api.clone(),
            container_content_api,
            pod_content_api,
            shared_mount,
        ));

        // Create a single watcher instance that handles all CRD types
        let watcher_instance = Arc::new(Watcher::new(
            reconciler,
            migration_api,
            pod_checkpoint_api,
            container_checkpoint_api,
        ));

        // Start all watchers in background tasks
        let migration_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_migrations().await })
        };

        let pod_checkpoint_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_pod_checkpoints().await })
        };

        let container_checkpoint_watcher = {
            let watcher = watcher_instance;
            tokio::spawn(async move { watcher.watch_container_checkpoints().await })
        };

        Ok(Self {
            migration_watcher,
            pod_checkpoint_watcher,
            container_checkpoint_watcher,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Migration Controller running");

        // Wait for any watcher to exit (they should run forever)
        tokio::select! {
            result = &mut self.migration_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("PodMigration watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("PodMigration watcher error: {}", e)))?;
            }
            result = &mut self.pod_checkpoint_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("PodCheckpoint watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("PodCheckpoint watcher error: {}", e)))?;
            }
            result = &mut self.container_checkpoint_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("ContainerCheckpoint watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("ContainerCheckpoint watcher error: {}", e)))?;
            }
        }

        Ok(())
    }
}
