//! Entando platform operator
//!
//! Watches `EntandoKeycloakServer` and `EntandoDatabaseService` custom
//! resources and provisions the cluster objects they declare: Deployments,
//! Services, and Ingresses for an identity server, and vendor database
//! deployments whose images are chosen by the compliance-mode strategy
//! matrix.
//!
//! The reconciliation core is synchronous and side-effect-free except through
//! the [`cluster::ClusterFacade`], which is injected at the controller's
//! entry point. The kube runtime serializes reconciliation per resource, so
//! the per-pass [`crd::DeploymentResult`] never sees concurrent writers.

pub mod cluster;
pub mod config;
pub mod controller;
pub mod crd;
pub mod resources;

pub use cluster::{ClusterFacade, ClusterOperationError, KubeFacade};
pub use config::OperatorConfig;
pub use controller::{
    Context, Error, Result, database_error_policy, error_policy, reconcile, reconcile_database,
};
pub use crd::{
    ComplianceMode, DbmsVendor, DeploymentPhase, DeploymentResult, DockerVendorStrategy,
    EntandoDatabaseService, EntandoKeycloakServer, ParseError, ResourceReference,
};

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::Controller;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;

/// Helper to create a namespaced or cluster-wide API based on scope.
fn scoped_api<T>(client: Client, namespace: Option<&str>) -> Api<T>
where
    T: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <T as Resource>::DynamicType: Default,
    T: Clone + DeserializeOwned + std::fmt::Debug,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Run the identity server controller.
///
/// Watches EntandoKeycloakServer resources plus the Deployments, Services,
/// and Ingresses they own, and reconciles them until the stream ends.
pub async fn run_controller(client: Client, config: OperatorConfig) {
    let scope = config.watch_namespace.clone();
    let scope_msg = scope.as_deref().unwrap_or("cluster-wide");
    tracing::info!(
        "Starting controller for EntandoKeycloakServer resources (scope: {})",
        scope_msg
    );

    let ctx = Arc::new(Context::new(KubeFacade::new(client.clone()), config));

    let servers: Api<EntandoKeycloakServer> = scoped_api(client.clone(), scope.as_deref());
    let deployments: Api<Deployment> = scoped_api(client.clone(), scope.as_deref());
    let services: Api<Service> = scoped_api(client.clone(), scope.as_deref());
    let ingresses: Api<Ingress> = scoped_api(client.clone(), scope.as_deref());

    let watcher_config = WatcherConfig::default().any_semantic();

    Controller::new(servers, watcher_config.clone())
        .owns(deployments, watcher_config.clone())
        .owns(services, watcher_config.clone())
        .owns(ingresses, watcher_config)
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    tracing::debug!("Reconciled: {}", obj.name);
                }
                Err(e) => {
                    // NotFound errors are expected after deletion when
                    // related watch events fire for a deleted object
                    let is_not_found = format!("{:?}", e).contains("NotFound");
                    if is_not_found {
                        tracing::debug!("Object no longer exists (likely deleted): {:?}", e);
                    } else {
                        tracing::error!("Reconciliation error: {:?}", e);
                    }
                }
            }
        })
        .await;

    // This should never complete in normal operation
    tracing::error!("Controller stream ended unexpectedly");
}

/// Run the database service controller.
///
/// Watches EntandoDatabaseService resources plus their owned Deployments and
/// Services.
pub async fn run_database_controller(client: Client, config: OperatorConfig) {
    let scope = config.watch_namespace.clone();
    let scope_msg = scope.as_deref().unwrap_or("cluster-wide");
    tracing::info!(
        "Starting controller for EntandoDatabaseService resources (scope: {})",
        scope_msg
    );

    let ctx = Arc::new(Context::new(KubeFacade::new(client.clone()), config));

    let databases: Api<EntandoDatabaseService> = scoped_api(client.clone(), scope.as_deref());
    let deployments: Api<Deployment> = scoped_api(client.clone(), scope.as_deref());
    let services: Api<Service> = scoped_api(client.clone(), scope.as_deref());

    let watcher_config = WatcherConfig::default().any_semantic();

    Controller::new(databases, watcher_config.clone())
        .owns(deployments, watcher_config.clone())
        .owns(services, watcher_config)
        .run(reconcile_database, database_error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    tracing::debug!("Reconciled database: {}", obj.name);
                }
                Err(e) => {
                    let is_not_found = format!("{:?}", e).contains("NotFound");
                    if is_not_found {
                        tracing::debug!("Database object no longer exists: {:?}", e);
                    } else {
                        tracing::error!("Database reconciliation error: {:?}", e);
                    }
                }
            }
        })
        .await;

    tracing::error!("Database controller stream ended unexpectedly");
}
