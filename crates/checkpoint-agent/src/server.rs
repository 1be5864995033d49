//! gRPC service implementation
//!
//! Every failure is reported in-band as a `success=false` response with the
//! error string attached; the RPC itself always completes. This keeps the
//! controller's reconcile retry and the kubelet backoff in this process from
//! compounding.

use crate::config::AgentConfig;
use crate::error::CheckpointError;
use crate::kubelet::KubeletClient;
use crate::{image, storage};
use checkpoint_proto::{
    CheckpointRequest, CheckpointResponse, CheckpointService, HealthRequest, HealthResponse,
    PackageAsImageRequest, PackageAsImageResponse,
};
use std::path::PathBuf;
use tonic::{Request, Response, Status};
use tracing::{error, info, warn};

/// The agent's gRPC service
pub struct CheckpointServer {
    config: AgentConfig,
}

impl CheckpointServer {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Drive one checkpoint end to end: kubelet call, then publication.
    async fn perform_checkpoint(
        &self,
        request: &CheckpointRequest,
    ) -> Result<String, CheckpointError> {
        tokio::fs::create_dir_all(&self.config.checkpoint_dir).await?;

        let kubelet = KubeletClient::new(&self.config.node_name, self.config.kubelet_port)?;
        let archives = kubelet
            .checkpoint(
                &request.pod_namespace,
                &request.pod_name,
                &request.container_name,
            )
            .await?;

        // First returned archive is the canonical local artifact.
        let local_path = PathBuf::from(&archives[0]);

        match storage::publish(
            &self.config.shared_mount,
            &request.pod_uid,
            &request.container_name,
            &local_path,
        )
        .await
        {
            Ok(filename) => Ok(format!("{}{}", storage::SHARED_SCHEME, filename)),
            Err(err) => {
                // Local fallback still counts as success; the URI records
                // which node holds the archive implicitly.
                warn!(
                    "Failed to publish to shared store, returning local path: {}",
                    err
                );
                Ok(format!("{}{}", storage::FILE_SCHEME, local_path.display()))
            }
        }
    }
}

#[tonic::async_trait]
impl CheckpointService for CheckpointServer {
    async fn checkpoint(
        &self,
        request: Request<CheckpointRequest>,
    ) -> Result<Response<CheckpointResponse>, Status> {
        let request = request.into_inner();
        info!(
            "Checkpoint request: namespace={}, pod={}, container={}, uid={}",
            request.pod_namespace, request.pod_name, request.container_name, request.pod_uid
        );

        let response = match self.perform_checkpoint(&request).await {
            Ok(artifact_uri) => {
                info!("Checkpoint created successfully: {}", artifact_uri);
                CheckpointResponse {
                    success: true,
                    artifact_uri,
                    message: "checkpoint created successfully".to_string(),
                    error: String::new(),
                }
            }
            Err(err) => {
                error!("Checkpoint failed: {}", err);
                CheckpointResponse {
                    success: false,
                    artifact_uri: String::new(),
                    message: String::new(),
                    error: format!("checkpoint failed: {}", err),
                }
            }
        };

        Ok(Response::new(response))
    }

    async fn package_as_image(
        &self,
        request: Request<PackageAsImageRequest>,
    ) -> Result<Response<PackageAsImageResponse>, Status> {
        let request = request.into_inner();
        info!(
            "PackageAsImage request: checkpoint_uri={}, container={}, image={}",
            request.checkpoint_uri, request.container_name, request.image_name
        );

        if request.checkpoint_uri.is_empty() {
            return Ok(Response::new(package_failure("checkpoint URI is required")));
        }
        if request.image_name.is_empty() {
            return Ok(Response::new(package_failure("image name is required")));
        }

        let response = match image::package_as_image(
            &self.config.shared_mount,
            &request.checkpoint_uri,
            &request.container_name,
            &request.image_name,
        )
        .await
        {
            Ok(image_reference) => PackageAsImageResponse {
                success: true,
                image_reference,
                message: "checkpoint packaged as image".to_string(),
                error: String::new(),
            },
            Err(err) => {
                error!("PackageAsImage failed: {}", err);
                package_failure(&err.to_string())
            }
        };

        Ok(Response::new(response))
    }

    async fn health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthResponse>, Status> {
        Ok(Response::new(HealthResponse {
            healthy: true,
            message: format!("checkpoint agent healthy on node {}", self.config.node_name),
        }))
    }
}

fn package_failure(error: &str) -> PackageAsImageResponse {
    PackageAsImageResponse {
        success: false,
        image_reference: String::new(),
        message: String::new(),
        error: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config(shared_mount: PathBuf) -> AgentConfig {
        AgentConfig {
            node_name: "n1".into(),
            port: 50051,
            kubelet_port: 10250,
            checkpoint_dir: shared_mount.join("local"),
            shared_mount,
        }
    }

    #[tokio::test]
    async fn health_reports_node_name() {
        let dir = tempfile::tempdir().unwrap();
        let server = CheckpointServer::new(test_config(dir.path().to_path_buf()));

        let response = server
            .health(Request::new(HealthRequest {}))
            .await
            .unwrap()
            .into_inner();

        assert!(response.healthy);
        assert!(response.message.contains("n1"));
    }

    #[tokio::test]
    async fn package_as_image_validates_input() {
        let dir = tempfile::tempdir().unwrap();
        let server = CheckpointServer::new(test_config(dir.path().to_path_buf()));

        let response = server
            .package_as_image(Request::new(PackageAsImageRequest {
                checkpoint_uri: String::new(),
                container_name: "c".into(),
                image_name: "localhost/checkpoint:x".into(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(!response.success);
        assert!(response.error.contains("checkpoint URI"));

        let response = server
            .package_as_image(Request::new(PackageAsImageRequest {
                checkpoint_uri: "shared://a.tar".into(),
                container_name: "c".into(),
                image_name: String::new(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(!response.success);
        assert!(response.error.contains("image name"));
    }

    #[tokio::test]
    async fn checkpoint_failure_is_reported_in_band() {
        let dir = tempfile::tempdir().unwrap();
        let server = CheckpointServer::new(test_config(dir.path().to_path_buf()));

        // No kubelet credentials exist in the test environment, so the
        // checkpoint fails; the RPC must still succeed with success=false.
        let response = server
            .checkpoint(Request::new(CheckpointRequest {
                pod_namespace: "default".into(),
                pod_name: "p1".into(),
                container_name: "c".into(),
                pod_uid: "uid-1".into(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(!response.success);
        assert!(response.error.starts_with("checkpoint failed:"));
    }
}
