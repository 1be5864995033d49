//! Kubernetes resource watchers.
//!
//! This module handles watching the migration CRDs for changes and
//! triggering reconciliation using kube_runtime::Controller.
//!
//! All watchers use a generic `watch_resource()` helper that properly handles
//! the reconcile loop with automatic reconnection and retry logic.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::{ContainerCheckpoint, PodCheckpoint, PodMigration};
use futures::StreamExt;
use kube::Api;
use kube_runtime::{
    controller::{Action, Config as ControllerConfig},
    watcher, Controller,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Generic watcher helper that uses kube_runtime::Controller properly.
///
/// - Controller handles automatic reconnection
/// - Retries and backoff are managed by the error policy
/// - Watching continues indefinitely (no one-shot behavior)
///
/// The reconcile_fn matches the reconciler method signature:
/// `async fn reconcile_x(&self, resource: &K) -> Result<Action, ControllerError>`
async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &str,
) -> Result<(), ControllerError>
where
    K: kube::Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Action, ControllerError>> + Send>> + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    // Error policy: transient errors requeue with a fixed delay
    let error_policy = |obj: Arc<K>, error: &ControllerError, _ctx: Arc<Reconciler>| {
        error!("Reconciliation error for {} {:?}: {}", resource_name, obj, error);
        Action::requeue(Duration::from_secs(10))
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        let resource_name = resource_name.to_string();
        async move {
            debug!("Reconciling {} {:?}", resource_name, obj);

            match reconcile_fn(ctx, obj).await {
                Ok(action) => Ok(action),
                Err(e) => {
                    error!("Reconciliation failed for {}: {}", resource_name, e);
                    Err(e)
                }
            }
        }
    };

    // Bound in-flight work per watcher; the phase machines requeue themselves
    // with short delays while waiting on children, so keep debounce small.
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(1))
        .concurrency(3);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Controller error for {}: {}", resource_name, e);
            }
        })
        .await;

    Ok(())
}

/// Watches the migration CRDs for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    migration_api: Api<PodMigration>,
    pod_checkpoint_api: Api<PodCheckpoint>,
    container_checkpoint_api: Api<ContainerCheckpoint>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        reconciler: Arc<Reconciler>,
        migration_api: Api<PodMigration>,
        pod_checkpoint_api: Api<PodCheckpoint>,
        container_checkpoint_api: Api<ContainerCheckpoint>,
    ) -> Self {
        Self {
            reconciler,
            migration_api,
            pod_checkpoint_api,
            container_checkpoint_api,
        }
    }

    /// Starts watching PodMigration resources.
    pub async fn watch_migrations(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.migration_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| {
                Box::pin(async move { reconciler.reconcile_migration(&resource).await })
            },
            "PodMigration",
        )
        .await
    }

    /// Starts watching PodCheckpoint resources.
    pub async fn watch_pod_checkpoints(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.pod_checkpoint_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| {
                Box::pin(async move { reconciler.reconcile_pod_checkpoint(&resource).await })
            },
            "PodCheckpoint",
        )
        .await
    }

    /// Starts watching ContainerCheckpoint resources.
    pub async fn watch_container_checkpoints(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.container_checkpoint_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| {
                Box::pin(async move { reconciler.reconcile_container_checkpoint(&resource).await })
            },
            "ContainerCheckpoint",
        )
        .await
    }
}
