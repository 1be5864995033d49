//! AgentClient trait for mocking
//!
//! This trait abstracts the agent client to enable mocking in unit tests.
//! Reconcilers receive the narrow capability set {Checkpoint, PackageAsImage,
//! Health} at construction; the concrete client and the mock both implement it.

use crate::error::AgentError;

/// Operations a reconciler may perform against a node's checkpoint agent
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait AgentClientTrait: Send + Sync {
    /// Checkpoint a container on the given node. Returns the artifact URI
    /// (`shared://<filename>` or `file://<path>`).
    async fn checkpoint_container(
        &self,
        node_name: &str,
        pod_namespace: &str,
        pod_name: &str,
        container_name: &str,
        pod_uid: &str,
    ) -> Result<String, AgentError>;

    /// Repackage a published archive as a restorable image on the given node.
    /// Returns the committed image reference.
    async fn package_as_image(
        &self,
        node_name: &str,
        checkpoint_uri: &str,
        container_name: &str,
        image_name: &str,
    ) -> Result<String, AgentError>;

    /// Probe the agent on the given node. Returns its status message.
    async fn health(&self, node_name: &str) -> Result<String, AgentError>;
}
