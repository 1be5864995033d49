//! gRPC protocol for the checkpoint agent
//!
//! Generated from `proto/agent.proto`. The descriptor set is exposed so the
//! agent can register server reflection.

pub mod agent {
    tonic::include_proto!("lpm.agent.v1");

    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("agent_descriptor");
}

pub use agent::checkpoint_service_client::CheckpointServiceClient;
pub use agent::checkpoint_service_server::{CheckpointService, CheckpointServiceServer};
pub use agent::{
    CheckpointRequest, CheckpointResponse, HealthRequest, HealthResponse, PackageAsImageRequest,
    PackageAsImageResponse,
};

/// Fixed port the agent listens on, on every node.
pub const AGENT_PORT: u16 = 50051;

/// Upper bound for gRPC messages in both directions (100 MiB).
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;
