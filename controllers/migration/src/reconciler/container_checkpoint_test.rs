//! Unit tests for the ContainerCheckpoint reconciler

use super::container_checkpoint::{checkpoint_failed_patch, checkpoint_succeeded_patch};
use agent_client::{AgentClientTrait, MockAgentClient};

#[test]
fn failed_patch_is_terminal_and_not_ready() {
    let patch = checkpoint_failed_patch("checkpointing failed: kubelet responded 404");

    assert_eq!(patch["status"]["phase"], "Failed");
    assert_eq!(patch["status"]["ready"], false);
    assert!(patch["status"]["completionTime"].is_string());
    assert!(patch["status"]["message"]
        .as_str()
        .unwrap()
        .contains("404"));
    // No content is bound on failure.
    assert!(patch["status"].get("boundContentName").is_none());
}

#[test]
fn succeeded_patch_binds_content_in_the_same_update() {
    // Bind + ready + phase + completion land in a single status update so a
    // crash cannot separate them.
    let patch = checkpoint_succeeded_patch("m1-c");

    assert_eq!(patch["status"]["phase"], "Succeeded");
    assert_eq!(patch["status"]["ready"], true);
    assert_eq!(patch["status"]["boundContentName"], "m1-c");
    assert_eq!(patch["status"]["message"], "done");
    assert!(patch["status"]["completionTime"].is_string());
}

#[tokio::test]
async fn mock_agent_supports_at_most_once_assertions() {
    // The reconciler's guard is status-based; what tests need from the mock
    // is an accurate per-container call count.
    let agent = MockAgentClient::new();

    agent
        .checkpoint_container("n1", "default", "p1", "c", "uid-p1")
        .await
        .unwrap();

    assert_eq!(agent.checkpoint_call_count("p1", "c"), 1);
    assert_eq!(agent.checkpoint_call_count("p1", "other"), 0);
}

#[tokio::test]
async fn agent_failure_carries_the_endpoint_error_text() {
    let agent = MockAgentClient::new();
    agent.fail_checkpoint("p1", "c", "kubelet responded 404: checkpoint not supported");

    let err = agent
        .checkpoint_container("n1", "default", "p1", "c", "uid-p1")
        .await
        .unwrap_err();

    // The endpoint's status text must survive into the failure message the
    // reconciler writes to status.
    assert!(err.to_string().contains("kubelet responded 404"));
}

// Full reconcile tests require a Kubernetes API (kube::Api) behind the
// reconciler; the agent side is already covered by MockAgentClient. These
// run against a live cluster only.

#[tokio::test]
#[ignore] // Requires a running cluster with the CRDs installed
async fn reconcile_succeeds_and_creates_content() {
    use crate::reconciler::Reconciler;
    use kube::{Api, Client};

    let kube_client = Client::try_default().await.expect("kubeconfig available");
    let agent = MockAgentClient::new();
    let reconciler = Reconciler::new(
        Box::new(agent.clone()),
        Api::namespaced(kube_client.clone(), "default"),
        Api::all(kube_client.clone()),
        Api::namespaced(kube_client.clone(), "default"),
        Api::namespaced(kube_client.clone(), "default"),
        Api::namespaced(kube_client.clone(), "default"),
        Api::namespaced(kube_client.clone(), "default"),
        Api::namespaced(kube_client.clone(), "default"),
        "/mnt/checkpoints".into(),
    );

    let checkpoint = crate::test_utils::make_container_checkpoint(
        "m1-c",
        "p1",
        "c",
        crds::ContainerCheckpointPhase::Running,
        None,
    );

    let action = reconciler
        .reconcile_container_checkpoint(&checkpoint)
        .await
        .expect("reconcile succeeds");

    // Exactly one agent call, content created with the checkpoint's name.
    assert_eq!(agent.checkpoint_call_count("p1", "c"), 1);
    let _ = action;
}
