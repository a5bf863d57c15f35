//! Reconciliation logic for EntandoDatabaseService resources
//!
//! Follows the same phase machine as the identity server reconciler; the
//! difference is image selection, which runs through the vendor/compliance
//! strategy matrix instead of a user-supplied default image.

use std::sync::Arc;
use std::time::Duration;

use kube::ResourceExt;
use kube::runtime::controller::Action;
use tracing::{debug, error, info, instrument, warn};

use crate::cluster::ClusterFacade;
use crate::controller::context::Context;
use crate::controller::error::{BackoffConfig, Error, Result};
use crate::controller::reconciler::{
    PassDisposition, add_finalizer, disposition, handle_deletion, has_finalizer,
    references_resolve, requeue_for,
};
use crate::controller::status::StatusManager;
use crate::crd::{
    DbmsVendor, DeploymentPhase, DeploymentResult, DockerVendorStrategy, EntandoCustomResource,
    EntandoDatabaseService,
};
use crate::resources::{deployment, service};

/// Main reconciliation function for EntandoDatabaseService
#[instrument(skip(database, ctx), fields(name = %database.name_any(), namespace = database.namespace().unwrap_or_default()))]
pub async fn reconcile_database<F: ClusterFacade>(
    database: Arc<EntandoDatabaseService>,
    ctx: Arc<Context<F>>,
) -> Result<Action> {
    info!("Reconciling EntandoDatabaseService");

    if database.metadata.deletion_timestamp.is_some() {
        debug!("Resource is being deleted, releasing finalizer");
        return handle_deletion(database.as_ref(), &ctx.facade).await;
    }

    if !has_finalizer(database.as_ref()) {
        add_finalizer(database.as_ref(), &ctx.facade).await?;
        return Ok(Action::requeue(Duration::from_secs(1)));
    }

    let status = StatusManager::new(database.as_ref(), &ctx.facade);

    match disposition(database.as_ref(), &ctx.config) {
        PassDisposition::InProgress => {
            debug!("Pass already started, waiting for it to finish or go stale");
            return Ok(requeue_for(
                DeploymentPhase::Started,
                database.as_ref(),
                &ctx.config,
            ));
        }
        PassDisposition::Verify => {
            let result = database
                .status()
                .map(|s| s.deployment_result.clone())
                .unwrap_or_default();
            if references_resolve(&ctx.facade, &result).await? {
                debug!("Spec unchanged and references resolve, no work needed");
                return Ok(requeue_for(
                    DeploymentPhase::Successful,
                    database.as_ref(),
                    &ctx.config,
                ));
            }
            info!("Recorded references no longer resolve, re-running full pass");
        }
        PassDisposition::Full => {}
    }

    if database.phase().is_none() {
        status.set_requested().await?;
    }
    status.set_started().await?;

    let mut result = database
        .status()
        .map(|s| s.deployment_result.clone())
        .unwrap_or_default();

    match deploy_database(&database, &ctx, &mut result).await {
        Ok(()) => {
            status.set_successful(result).await?;
            info!("Reconciliation completed successfully");
            Ok(requeue_for(
                DeploymentPhase::Successful,
                database.as_ref(),
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

/// Apply the database's cluster objects and record their references.
async fn deploy_database<F: ClusterFacade>(
    database: &EntandoDatabaseService,
    ctx: &Context<F>,
    result: &mut DeploymentResult,
) -> Result<()> {
    // Decode the stored vendor at the boundary; an absent vendor means "let
    // the operator choose" and defaults to PostgreSQL
    let vendor = database.spec.dbms()?.unwrap_or(DbmsVendor::Postgresql);
    let strategy = DockerVendorStrategy::resolve(vendor, ctx.config.compliance_mode);
    debug!(
        vendor = %vendor,
        compliance = %ctx.config.compliance_mode,
        image = %strategy.qualified_image(),
        "Resolved vendor image strategy"
    );

    let desired_deployment = deployment::database_deployment(database, strategy);
    result.record_deployment(ctx.facade.create_or_update(&desired_deployment).await?);

    let desired_service = service::database_service(database, strategy);
    result.record_service(ctx.facade.create_or_update(&desired_service).await?);

    let namespace = database
        .namespace()
        .ok_or(Error::MissingObjectKey("metadata.namespace"))?;
    let selector = format!("entando.org/deployment={}", database.name_any());
    match ctx.facade.find_pod(&namespace, &selector).await? {
        Some(pod) => result.record_pod(pod),
        None => result.clear_pod(),
    }

    Ok(())
}

/// Error policy for the database controller with exponential backoff
pub fn database_error_policy<F: ClusterFacade>(
    database: Arc<EntandoDatabaseService>,
    error: &Error,
    _ctx: Arc<Context<F>>,
) -> Action {
    let delay = BackoffConfig::default().delay_for_error(error, 0);

    if error.is_retryable() {
        warn!(
            "Retryable error for {}: {}, requeuing in {:?}",
            database.name_any(),
            error,
            delay
        );
    } else {
        error!(
            "Non-retryable error for {}: {}, requeuing in {:?} for manual intervention",
            database.name_any(),
            error,
            delay
        );
    }

    Action::requeue(delay)
}
