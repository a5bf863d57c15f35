//! Reconciliation logic for EntandoKeycloakServer resources
//!
//! One pass walks the deployment phase machine: `requested` when the resource
//! is first observed, `started` while objects are being applied, then
//! `successful` or `failed`. The phase's `requires_sync` decides whether the
//! pass requeues for an immediate re-check or waits for changes.

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use kube::runtime::controller::Action;
use tracing::{debug, error, info, instrument, warn};

use crate::cluster::ClusterFacade;
use crate::config::OperatorConfig;
use crate::controller::context::Context;
use crate::controller::error::{BackoffConfig, Error, Result};
use crate::controller::status::{
    StatusManager, self_reference, spec_changed, started_is_stale, started_remaining,
};
use crate::crd::{DeploymentPhase, DeploymentResult, EntandoCustomResource, EntandoKeycloakServer};
use crate::resources::{deployment, ingress, service};

/// Finalizer held on every reconciled custom resource until its deletion has
/// been observed
pub const FINALIZER: &str = "entando.org/finalizer";

/// What a reconciliation pass should do for the resource's current state.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PassDisposition {
    /// Run a full pass, applying all desired objects
    Full,
    /// Resource is successful and unchanged; just revalidate references
    Verify,
    /// Another pass appears to be in progress; wait for it or for staleness
    InProgress,
}

/// Decide the pass disposition from the phase machine.
///
/// `started` is the only phase that does not require sync; it is honored
/// until the supervisory timeout declares the pass abandoned.
pub(crate) fn disposition<K: EntandoCustomResource>(
    resource: &K,
    config: &OperatorConfig,
) -> PassDisposition {
    match resource.phase() {
        Some(DeploymentPhase::Started) => {
            if started_is_stale(resource, config.stale_started_timeout) {
                warn!("Abandoned pass detected in phase 'started', re-entering");
                PassDisposition::Full
            } else {
                PassDisposition::InProgress
            }
        }
        Some(DeploymentPhase::Successful) if !spec_changed(resource) => PassDisposition::Verify,
        _ => PassDisposition::Full,
    }
}

/// Revalidate recorded references against the cluster.
///
/// References are minimal identities, not snapshots, so each use re-fetches
/// the live object. Any missing object means the result is no longer
/// trustworthy and a full pass is needed.
pub(crate) async fn references_resolve<F: ClusterFacade>(
    facade: &F,
    result: &DeploymentResult,
) -> Result<bool> {
    if let Some(reference) = result.deployment()
        && facade.get::<Deployment>(reference).await?.is_none()
    {
        return Ok(false);
    }
    if let Some(reference) = result.service()
        && facade.get::<Service>(reference).await?.is_none()
    {
        return Ok(false);
    }
    if let Some(reference) = result.pod()
        && facade.get::<Pod>(reference).await?.is_none()
    {
        return Ok(false);
    }
    if let Some(reference) = result.ingress()
        && facade.get::<Ingress>(reference).await?.is_none()
    {
        return Ok(false);
    }
    Ok(true)
}

/// Requeue according to the current phase: every phase except `started` asks
/// the reconciler to check the cluster again at the sync interval. A
/// `started` pass waits only until its record would go stale, however old
/// the record already is.
pub(crate) fn requeue_for<K: EntandoCustomResource>(
    phase: DeploymentPhase,
    resource: &K,
    config: &OperatorConfig,
) -> Action {
    if phase.requires_sync() {
        Action::requeue(config.sync_interval)
    } else {
        Action::requeue(started_remaining(resource, config.stale_started_timeout))
    }
}

/// Whether the resource carries the operator's finalizer.
pub(crate) fn has_finalizer<K: EntandoCustomResource>(resource: &K) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|finalizers| finalizers.iter().any(|f| f == FINALIZER))
}

/// Attach the finalizer on first observation, so deletion is held until the
/// operator has seen it.
pub(crate) async fn add_finalizer<K, F>(resource: &K, facade: &F) -> Result<()>
where
    K: EntandoCustomResource,
    F: ClusterFacade,
{
    let patch = serde_json::json!({
        "metadata": {
            "finalizers": [FINALIZER]
        }
    });
    facade.patch::<K>(&self_reference(resource), patch).await?;
    info!("Added finalizer");
    Ok(())
}

/// Release a deleted resource. Child objects are garbage-collected through
/// their owner references; the only work left is dropping the finalizer so
/// the deletion can complete.
pub(crate) async fn handle_deletion<K, F>(resource: &K, facade: &F) -> Result<Action>
where
    K: EntandoCustomResource,
    F: ClusterFacade,
{
    if has_finalizer(resource) {
        let patch = serde_json::json!({
            "metadata": {
                "finalizers": null
            }
        });
        facade.patch::<K>(&self_reference(resource), patch).await?;
        info!("Removed finalizer");
    }
    Ok(Action::await_change())
}

/// Main reconciliation function for EntandoKeycloakServer
#[instrument(skip(server, ctx), fields(name = %server.name_any(), namespace = server.namespace().unwrap_or_default()))]
pub async fn reconcile<F: ClusterFacade>(
    server: Arc<EntandoKeycloakServer>,
    ctx: Arc<Context<F>>,
) -> Result<Action> {
    info!("Reconciling EntandoKeycloakServer");

    if server.metadata.deletion_timestamp.is_some() {
        debug!("Resource is being deleted, releasing finalizer");
        return handle_deletion(server.as_ref(), &ctx.facade).await;
    }

    if !has_finalizer(server.as_ref()) {
        add_finalizer(server.as_ref(), &ctx.facade).await?;
        return Ok(Action::requeue(Duration::from_secs(1)));
    }

    let status = StatusManager::new(server.as_ref(), &ctx.facade);

    match disposition(server.as_ref(), &ctx.config) {
        PassDisposition::InProgress => {
            debug!("Pass already started, waiting for it to finish or go stale");
            return Ok(requeue_for(DeploymentPhase::Started, server.as_ref(), &ctx.config));
        }
        PassDisposition::Verify => {
            let result = server
                .status()
                .map(|s| s.deployment_result.clone())
                .unwrap_or_default();
            if references_resolve(&ctx.facade, &result).await? {
                debug!("Spec unchanged and references resolve, no work needed");
                return Ok(requeue_for(
                    DeploymentPhase::Successful,
                    server.as_ref(),
                    &ctx.config,
                ));
            }
            info!("Recorded references no longer resolve, re-running full pass");
        }
        PassDisposition::Full => {}
    }

    if server.phase().is_none() {
        status.set_requested().await?;
    }
    status.set_started().await?;

    // Partial results survive a failed pass so the retry does not recreate
    // objects that already succeeded
    let mut result = server
        .status()
        .map(|s| s.deployment_result.clone())
        .unwrap_or_default();

    match deploy_server(&server, &ctx, &mut result).await {
        Ok(()) => {
            status.set_successful(result).await?;
            info!("Reconciliation completed successfully");
            Ok(requeue_for(
                DeploymentPhase::Successful,
                server.as_ref(),
                &ctx.config,
            ))
        }
        Err(e) => {
            error!("Reconciliation failed: {}", e);
            let _ = status.set_failed(&e.to_string(), result).await;
            Err(e)
        }
    }
}

/// Apply the identity server's cluster objects and record their references.
async fn deploy_server<F: ClusterFacade>(
    server: &EntandoKeycloakServer,
    ctx: &Context<F>,
    result: &mut DeploymentResult,
) -> Result<()> {
    // Validate stored vendor text at the boundary before any object is built
    let _vendor = server.spec.dbms()?;

    let desired_deployment = deployment::server_deployment(server, &ctx.config);
    result.record_deployment(ctx.facade.create_or_update(&desired_deployment).await?);

    let desired_service = service::server_service(server);
    result.record_service(ctx.facade.create_or_update(&desired_service).await?);

    // A resource with no public host name legitimately has no Ingress; a
    // reference recorded for an earlier spec must not outlive it
    if server.spec.ingress_host_name().is_some() {
        let desired_ingress = ingress::server_ingress(server);
        result.record_ingress(ctx.facade.create_or_update(&desired_ingress).await?);
    } else {
        result.clear_ingress();
    }

    let namespace = server
        .namespace()
        .ok_or(Error::MissingObjectKey("metadata.namespace"))?;
    let selector = format!("entando.org/deployment={}", server.name_any());
    match ctx.facade.find_pod(&namespace, &selector).await? {
        Some(pod) => result.record_pod(pod),
        None => result.clear_pod(),
    }

    Ok(())
}

/// Error policy for the controller with exponential backoff
pub fn error_policy<F: ClusterFacade>(
    server: Arc<EntandoKeycloakServer>,
    error: &Error,
    _ctx: Arc<Context<F>>,
) -> Action {
    let delay = BackoffConfig::default().delay_for_error(error, 0);

    if error.is_retryable() {
        warn!(
            "Retryable error for {}: {}, requeuing in {:?}",
            server.name_any(),
            error,
            delay
        );
    } else {
        error!(
            "Non-retryable error for {}: {}, requeuing in {:?} for manual intervention",
            server.name_any(),
            error,
            delay
        );
    }

    Action::requeue(delay)
}
