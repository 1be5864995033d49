//! Checkpoint Agent
//!
//! Per-node daemon that captures container state through the kubelet's
//! checkpoint endpoint, publishes the resulting archive into the shared
//! checkpoint store, and optionally repackages it as a restorable image.
//!
//! The agent exposes a small gRPC surface (Checkpoint, PackageAsImage,
//! Health) consumed by the migration controllers. All agent-level failures
//! are reported in-band as `success=false` responses so the controller's
//! retry loop and the kubelet's retry loop do not compound.

pub mod backoff;
pub mod config;
pub mod error;
pub mod image;
pub mod kubelet;
pub mod server;
pub mod storage;

pub use config::AgentConfig;
pub use error::CheckpointError;
pub use server::CheckpointServer;
