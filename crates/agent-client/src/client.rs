//! Checkpoint agent gRPC client
//!
//! Resolves a node's InternalIP from its status addresses and dials the
//! agent on the fixed per-node port. Agent-level failures arrive in-band
//! (`success=false`) and are mapped onto `AgentError`; only transport and
//! gRPC-status problems surface as their own variants.

use crate::agent_trait::AgentClientTrait;
use crate::error::AgentError;
use checkpoint_proto::{
    CheckpointRequest, CheckpointServiceClient, HealthRequest, PackageAsImageRequest,
    MAX_MESSAGE_SIZE,
};
use k8s_openapi::api::core::v1::Node;
use kube::{Api, Client};
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

/// gRPC client for per-node checkpoint agents
pub struct AgentClient {
    kube_client: Client,
    port: u16,
}

impl AgentClient {
    /// Create a new agent client
    ///
    /// # Arguments
    /// * `kube_client` - Kubernetes client used to resolve node addresses
    /// * `port` - agent port on every node (default 50051)
    pub fn new(kube_client: Client, port: u16) -> Self {
        Self { kube_client, port }
    }

    /// Resolve the agent endpoint for a node from its InternalIP.
    async fn node_endpoint(&self, node_name: &str) -> Result<String, AgentError> {
        let nodes: Api<Node> = Api::all(self.kube_client.clone());
        let node = nodes.get(node_name).await?;

        let addresses = node
            .status
            .and_then(|status| status.addresses)
            .unwrap_or_default();

        addresses
            .iter()
            .find(|addr| addr.type_ == "InternalIP")
            .map(|addr| format!("http://{}:{}", addr.address, self.port))
            .ok_or_else(|| AgentError::NoInternalIp(node_name.to_string()))
    }

    /// Dial the agent on the given node.
    async fn dial(&self, node_name: &str) -> Result<CheckpointServiceClient<Channel>, AgentError> {
        let endpoint = self.node_endpoint(node_name).await?;
        debug!("Dialing checkpoint agent at {}", endpoint);

        let channel = Endpoint::from_shared(endpoint)?.connect().await?;

        Ok(CheckpointServiceClient::new(channel)
            .max_decoding_message_size(MAX_MESSAGE_SIZE)
            .max_encoding_message_size(MAX_MESSAGE_SIZE))
    }
}

#[async_trait::async_trait]
impl AgentClientTrait for AgentClient {
    async fn checkpoint_container(
        &self,
        node_name: &str,
        pod_namespace: &str,
        pod_name: &str,
        container_name: &str,
        pod_uid: &str,
    ) -> Result<String, AgentError> {
        let mut client = self.dial(node_name).await?;

        let response = client
            .checkpoint(CheckpointRequest {
                pod_namespace: pod_namespace.to_string(),
                pod_name: pod_name.to_string(),
                container_name: container_name.to_string(),
                pod_uid: pod_uid.to_string(),
            })
            .await?
            .into_inner();

        if !response.success {
            return Err(AgentError::Checkpoint(response.error));
        }

        debug!(
            "Checkpoint of {}/{}/{} produced {}",
            pod_namespace, pod_name, container_name, response.artifact_uri
        );
        Ok(response.artifact_uri)
    }

    async fn package_as_image(
        &self,
        node_name: &str,
        checkpoint_uri: &str,
        container_name: &str,
        image_name: &str,
    ) -> Result<String, AgentError> {
        let mut client = self.dial(node_name).await?;

        let response = client
            .package_as_image(PackageAsImageRequest {
                checkpoint_uri: checkpoint_uri.to_string(),
                container_name: container_name.to_string(),
                image_name: image_name.to_string(),
            })
            .await?
            .into_inner();

        if !response.success {
            return Err(AgentError::Package(response.error));
        }

        Ok(response.image_reference)
    }

    async fn health(&self, node_name: &str) -> Result<String, AgentError> {
        let mut client = self.dial(node_name).await?;

        let response = client.health(HealthRequest {}).await?.into_inner();

        if !response.healthy {
            return Err(AgentError::Unhealthy(response.message));
        }

        Ok(response.message)
    }
}
