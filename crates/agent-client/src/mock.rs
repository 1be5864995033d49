//! Mock agent client for unit testing
//!
//! An in-memory implementation of `AgentClientTrait` that records every call
//! and returns scripted results, so reconciler tests can run without nodes
//! or agents. In particular, call recording lets tests assert that the
//! control plane invokes the agent at most once per checkpoint object.

use crate::agent_trait::AgentClientTrait;
use crate::error::AgentError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A recorded Checkpoint call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointCall {
    pub node_name: String,
    pub pod_namespace: String,
    pub pod_name: String,
    pub container_name: String,
    pub pod_uid: String,
}

/// Mock agent client for testing
///
/// By default every checkpoint succeeds with a `shared://` URI derived from
/// the pod UID and container name. Individual (pod, container) pairs can be
/// scripted to fail.
#[derive(Clone, Default)]
pub struct MockAgentClient {
    calls: Arc<Mutex<Vec<CheckpointCall>>>,
    // (pod_name, container_name) -> error message
    failures: Arc<Mutex<HashMap<(String, String), String>>>,
    healthy: Arc<Mutex<bool>>,
}

impl MockAgentClient {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            healthy: Arc::new(Mutex::new(true)),
        }
    }

    /// Script a checkpoint failure for one container (for test setup)
    pub fn fail_checkpoint(&self, pod_name: &str, container_name: &str, error: &str) {
        self.failures.lock().unwrap().insert(
            (pod_name.to_string(), container_name.to_string()),
            error.to_string(),
        );
    }

    /// Mark the agent unhealthy (for test setup)
    pub fn set_unhealthy(&self) {
        *self.healthy.lock().unwrap() = false;
    }

    /// All recorded Checkpoint calls, in order
    pub fn checkpoint_calls(&self) -> Vec<CheckpointCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of Checkpoint calls recorded for one container
    pub fn checkpoint_call_count(&self, pod_name: &str, container_name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.pod_name == pod_name && call.container_name == container_name)
            .count()
    }
}

#[async_trait::async_trait]
impl AgentClientTrait for MockAgentClient {
    async fn checkpoint_container(
        &self,
        node_name: &str,
        pod_namespace: &str,
        pod_name: &str,
        container_name: &str,
        pod_uid: &str,
    ) -> Result<String, AgentError> {
        self.calls.lock().unwrap().push(CheckpointCall {
            node_name: node_name.to_string(),
            pod_namespace: pod_namespace.to_string(),
            pod_name: pod_name.to_string(),
            container_name: container_name.to_string(),
            pod_uid: pod_uid.to_string(),
        });

        let failure = self
            .failures
            .lock()
            .unwrap()
            .get(&(pod_name.to_string(), container_name.to_string()))
            .cloned();
        if let Some(error) = failure {
            return Err(AgentError::Checkpoint(error));
        }

        Ok(format!(
            "shared://{}-{}-20250101-000000.tar",
            pod_uid, container_name
        ))
    }

    async fn package_as_image(
        &self,
        _node_name: &str,
        _checkpoint_uri: &str,
        _container_name: &str,
        image_name: &str,
    ) -> Result<String, AgentError> {
        Ok(image_name.to_string())
    }

    async fn health(&self, node_name: &str) -> Result<String, AgentError> {
        if *self.healthy.lock().unwrap() {
            Ok(format!("checkpoint agent healthy on node {}", node_name))
        } else {
            Err(AgentError::Unhealthy("scripted failure".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_checkpoint_calls() {
        let mock = MockAgentClient::new();

        let uri = mock
            .checkpoint_container("n1", "default", "p1", "c", "uid-1")
            .await
            .unwrap();

        assert!(uri.starts_with("shared://uid-1-c-"));
        assert!(uri.ends_with(".tar"));
        assert_eq!(mock.checkpoint_call_count("p1", "c"), 1);
        assert_eq!(mock.checkpoint_calls()[0].node_name, "n1");
    }

    #[tokio::test]
    async fn scripted_failures_are_returned() {
        let mock = MockAgentClient::new();
        mock.fail_checkpoint("p1", "c", "kubelet responded 404: not found");

        let err = mock
            .checkpoint_container("n1", "default", "p1", "c", "uid-1")
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Checkpoint(_)));
        assert!(err.to_string().contains("404"));
        // The failed attempt is still recorded.
        assert_eq!(mock.checkpoint_call_count("p1", "c"), 1);
    }

    #[tokio::test]
    async fn health_reflects_scripted_state() {
        let mock = MockAgentClient::new();
        assert!(mock.health("n1").await.is_ok());

        mock.set_unhealthy();
        assert!(matches!(
            mock.health("n1").await,
            Err(AgentError::Unhealthy(_))
        ));
    }
}
