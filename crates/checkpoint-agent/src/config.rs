//! Agent configuration
//!
//! All knobs come from environment variables, with defaults that match a
//! kubeadm-provisioned host.

use std::env;
use std::path::PathBuf;

/// Runtime configuration for the checkpoint agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Name of the node this agent runs on
    pub node_name: String,

    /// Port the gRPC server listens on
    pub port: u16,

    /// Port of the local kubelet's HTTPS endpoint
    pub kubelet_port: u16,

    /// Directory the kubelet writes checkpoint archives to
    pub checkpoint_dir: PathBuf,

    /// Shared read-write-many mount, identical on every node
    pub shared_mount: PathBuf,
}

impl AgentConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let node_name = env::var("NODE_NAME").unwrap_or_else(|_| "unknown".to_string());
        let port = env::var("AGENT_PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(checkpoint_proto::AGENT_PORT);
        let kubelet_port = env::var("KUBELET_PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(10250);
        let checkpoint_dir = env::var("CHECKPOINT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/var/lib/kubelet/checkpoints"));
        let shared_mount = env::var("SHARED_MOUNT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/mnt/checkpoints"));

        Self {
            node_name,
            port,
            kubelet_port,
            checkpoint_dir,
            shared_mount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_kubeadm_layout() {
        // Only assert fields not overridable in this environment.
        let config = AgentConfig {
            node_name: "n1".into(),
            port: checkpoint_proto::AGENT_PORT,
            kubelet_port: 10250,
            checkpoint_dir: PathBuf::from("/var/lib/kubelet/checkpoints"),
            shared_mount: PathBuf::from("/mnt/checkpoints"),
        };
        assert_eq!(config.port, 50051);
        assert_eq!(config.kubelet_port, 10250);
    }
}
