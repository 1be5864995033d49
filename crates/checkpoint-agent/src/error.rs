//! Checkpoint agent errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Kubelet request failed at the transport level
    #[error("kubelet request failed: {0}")]
    Kubelet(#[from] reqwest::Error),

    /// Kubelet responded with a non-2xx status
    #[error("kubelet responded {status}: {body}")]
    KubeletStatus { status: u16, body: String },

    /// Kubelet produced no checkpoint files
    #[error("no checkpoint files returned by kubelet")]
    NoArchives,

    /// No usable client certificate triple on this host
    #[error("failed to load client certificate from any known location")]
    NoClientCredentials,

    /// Retries exhausted; carries the last attempt's error
    #[error("checkpoint failed after retries: {0}")]
    RetriesExhausted(Box<CheckpointError>),

    /// Archive packaging (buildah) failed
    #[error("image packaging failed: {0}")]
    Packaging(String),

    /// Source archive missing
    #[error("checkpoint file not found: {0}")]
    ArchiveNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse kubelet JSON response: {0}")]
    Serialization(#[from] serde_json::Error),
}
