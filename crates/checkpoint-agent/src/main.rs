//! Checkpoint Agent
//!
//! Per-node daemon exposing the Checkpoint/PackageAsImage/Health gRPC
//! surface consumed by the migration controllers. Registers the standard
//! gRPC health service and server reflection, and stops gracefully on
//! SIGINT/SIGTERM.

use anyhow::Result;
use checkpoint_agent::{AgentConfig, CheckpointServer};
use checkpoint_proto::agent::FILE_DESCRIPTOR_SET;
use checkpoint_proto::{CheckpointServiceServer, MAX_MESSAGE_SIZE};
use std::net::SocketAddr;
use tonic::transport::Server;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = AgentConfig::from_env();
    info!("Starting checkpoint agent on node {}", config.node_name);

    // Ensure the kubelet checkpoint directory exists before serving.
    tokio::fs::create_dir_all(&config.checkpoint_dir).await?;

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<CheckpointServiceServer<CheckpointServer>>()
        .await;

    let reflection_service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let checkpoint_service = CheckpointServiceServer::new(CheckpointServer::new(config))
        .max_decoding_message_size(MAX_MESSAGE_SIZE)
        .max_encoding_message_size(MAX_MESSAGE_SIZE);

    info!("Checkpoint agent listening on {}", addr);
    Server::builder()
        .add_service(health_service)
        .add_service(reflection_service)
        .add_service(checkpoint_service)
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    Ok(())
}

/// Resolve when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }

    info!("Shutting down checkpoint agent...");
}
