//! Integration tests for the agent client
//!
//! These tests require a running cluster with a checkpoint agent deployed.
//! Set AGENT_NODE (and optionally AGENT_PORT) to run.

use agent_client::{AgentClient, AgentClientTrait};

fn agent_port() -> u16 {
    std::env::var("AGENT_PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(50051)
}

#[tokio::test]
#[ignore] // Requires a running cluster and agent
async fn test_health_probe() {
    let node = std::env::var("AGENT_NODE").expect("AGENT_NODE environment variable must be set");

    let kube_client = kube::Client::try_default()
        .await
        .expect("Failed to create Kubernetes client");
    let client = AgentClient::new(kube_client, agent_port());

    let message = client.health(&node).await.expect("Agent health probe failed");
    println!("Agent reports: {}", message);
    assert!(message.contains(&node));
}

#[tokio::test]
#[ignore] // Requires a running cluster, agent, and a running target pod
async fn test_checkpoint_roundtrip() {
    let node = std::env::var("AGENT_NODE").expect("AGENT_NODE environment variable must be set");
    let pod = std::env::var("AGENT_TEST_POD").expect("AGENT_TEST_POD must name a running pod");
    let container = std::env::var("AGENT_TEST_CONTAINER")
        .unwrap_or_else(|_| "app".to_string());

    let kube_client = kube::Client::try_default()
        .await
        .expect("Failed to create Kubernetes client");
    let client = AgentClient::new(kube_client, agent_port());

    let uri = client
        .checkpoint_container(&node, "default", &pod, &container, "integration-test-uid")
        .await
        .expect("Checkpoint failed");

    println!("Checkpoint published at {}", uri);
    assert!(
        uri.starts_with("shared://") || uri.starts_with("file://"),
        "unexpected artifact URI: {}",
        uri
    );
}

#[tokio::test]
#[ignore] // Requires a running cluster and agent
async fn test_unknown_node_is_an_error() {
    let kube_client = kube::Client::try_default()
        .await
        .expect("Failed to create Kubernetes client");
    let client = AgentClient::new(kube_client, agent_port());

    let result = client.health("no-such-node").await;
    assert!(result.is_err());
}
