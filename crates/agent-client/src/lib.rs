//! Checkpoint Agent Client
//!
//! A client library for the per-node checkpoint agents. Reconcilers talk to
//! the agent running on a pod's host to capture container state and publish
//! the resulting archive.
//!
//! # Example
//!
//! ```no_run
//! use agent_client::{AgentClient, AgentClientTrait};
//!
//! # async fn example(kube_client: kube::Client) -> Result<(), Box<dyn std::error::Error>> {
//! let client = AgentClient::new(kube_client, 50051);
//!
//! // Checkpoint a container on its node; returns the artifact URI.
//! let uri = client
//!     .checkpoint_container("node-1", "default", "web", "app", "pod-uid")
//!     .await?;
//! assert!(uri.starts_with("shared://") || uri.starts_with("file://"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod agent_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use agent_trait::AgentClientTrait;
pub use client::AgentClient;
pub use error::AgentError;
#[cfg(feature = "test-util")]
pub use mock::MockAgentClient;
