//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test data and setting up test
//! scenarios.

use crds::{
    CheckpointReference, ContainerCheckpoint, ContainerCheckpointContent,
    ContainerCheckpointContentSpec, ContainerCheckpointPhase, ContainerCheckpointSpec,
    ContainerCheckpointStatus, LocalReference, PodCheckpointContent, PodCheckpointContentSpec,
    PodMigration, PodMigrationSpec,
};
use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, Pod, PodSpec, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Helper to create a test pod with realistic container configuration
pub fn make_pod(name: &str, node: &str, phase: &str, containers: &[&str]) -> Pod {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), name.to_string());

    let containers = containers
        .iter()
        .map(|container_name| Container {
            name: container_name.to_string(),
            image: Some("registry.example.com/app:v3".to_string()),
            command: Some(vec!["/bin/app".to_string(), "--serve".to_string()]),
            env: Some(vec![EnvVar {
                name: "MODE".to_string(),
                value: Some("production".to_string()),
                ..Default::default()
            }]),
            ports: Some(vec![ContainerPort {
                container_port: 8080,
                ..Default::default()
            }]),
            ..Default::default()
        })
        .collect();

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            uid: Some(format!("uid-{}", name)),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name: if node.is_empty() {
                None
            } else {
                Some(node.to_string())
            },
            service_account_name: Some("default-sa".to_string()),
            containers,
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
    }
}

/// Helper to create a test PodMigration
pub fn make_migration(name: &str, pod_name: &str, target_node: &str) -> PodMigration {
    PodMigration {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: PodMigrationSpec {
            pod_name: pod_name.to_string(),
            target_node: target_node.to_string(),
        },
        status: None,
    }
}

/// Helper to create a test ContainerCheckpoint in a given phase
pub fn make_container_checkpoint(
    name: &str,
    pod_name: &str,
    container_name: &str,
    phase: ContainerCheckpointPhase,
    bound_content_name: Option<&str>,
) -> ContainerCheckpoint {
    let ready = phase == ContainerCheckpointPhase::Succeeded && bound_content_name.is_some();
    ContainerCheckpoint {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: ContainerCheckpointSpec {
            pod_name: pod_name.to_string(),
            container_name: container_name.to_string(),
        },
        status: Some(ContainerCheckpointStatus {
            phase,
            ready,
            bound_content_name: bound_content_name.map(|bound| bound.to_string()),
            ..Default::default()
        }),
    }
}

/// Helper to create a test ContainerCheckpointContent
pub fn make_container_content(
    name: &str,
    pod_name: &str,
    container_name: &str,
    artifact_uri: &str,
) -> ContainerCheckpointContent {
    ContainerCheckpointContent {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: ContainerCheckpointContentSpec {
            container_checkpoint_ref: CheckpointReference::new("default", name),
            pod_namespace: "default".to_string(),
            pod_name: pod_name.to_string(),
            container_name: container_name.to_string(),
            artifact_uri: artifact_uri.to_string(),
        },
    }
}

/// Helper to create a test PodCheckpointContent
pub fn make_pod_content(name: &str, pod_name: &str, contents: &[&str]) -> PodCheckpointContent {
    PodCheckpointContent {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: PodCheckpointContentSpec {
            pod_checkpoint_ref: CheckpointReference::new("default", name),
            pod_namespace: "default".to_string(),
            pod_name: pod_name.to_string(),
            container_contents: contents
                .iter()
                .map(|content| LocalReference::new(*content))
                .collect(),
        },
        status: None,
    }
}
