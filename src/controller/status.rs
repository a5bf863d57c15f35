//! Status management for Entando custom resources
//!
//! The reconciler reports `(phase, observedGeneration, result references)` to
//! the status subresource through the cluster facade. Status writes are merge
//! patches, so a retried pass can safely re-emit the same status.

use std::time::Duration;

use chrono::{DateTime, Utc};
use kube::ResourceExt;
use tracing::debug;

use crate::cluster::ClusterFacade;
use crate::controller::error::Result;
use crate::crd::{
    DeploymentPhase, DeploymentResult, EntandoCustomResource, EntandoCustomResourceStatus,
    ResourceReference,
};

/// Writes phase transitions for one custom resource.
pub struct StatusManager<'a, K, F> {
    resource: &'a K,
    facade: &'a F,
}

impl<'a, K, F> StatusManager<'a, K, F>
where
    K: EntandoCustomResource,
    F: ClusterFacade,
{
    pub fn new(resource: &'a K, facade: &'a F) -> Self {
        Self { resource, facade }
    }

    /// Mark the resource as observed but not yet worked on.
    pub async fn set_requested(&self) -> Result<()> {
        let status = EntandoCustomResourceStatus {
            phase: Some(DeploymentPhase::Requested),
            phase_started_at: self.phase_started_at(DeploymentPhase::Requested),
            deployment_result: self.existing_result(),
            observed_generation: self.existing_observed_generation(),
            last_error: None,
        };
        self.patch(status).await
    }

    /// Mark the start of a reconciliation pass.
    pub async fn set_started(&self) -> Result<()> {
        let status = EntandoCustomResourceStatus {
            phase: Some(DeploymentPhase::Started),
            phase_started_at: self.phase_started_at(DeploymentPhase::Started),
            deployment_result: self.existing_result(),
            observed_generation: self.existing_observed_generation(),
            last_error: None,
        };
        self.patch(status).await
    }

    /// Record a completed pass: the new result supersedes the previous one
    /// wholesale, and the observed generation advances to the spec the pass
    /// acted on.
    pub async fn set_successful(&self, result: DeploymentResult) -> Result<()> {
        let status = EntandoCustomResourceStatus {
            phase: Some(DeploymentPhase::Successful),
            phase_started_at: self.phase_started_at(DeploymentPhase::Successful),
            deployment_result: result,
            observed_generation: self.resource.meta().generation,
            last_error: None,
        };
        self.patch(status).await
    }

    /// Record a failed pass. Partial results are preserved so a retried pass
    /// does not recreate objects that already succeeded.
    pub async fn set_failed(&self, message: &str, result: DeploymentResult) -> Result<()> {
        let status = EntandoCustomResourceStatus {
            phase: Some(DeploymentPhase::Failed),
            phase_started_at: self.phase_started_at(DeploymentPhase::Failed),
            deployment_result: result,
            observed_generation: self.existing_observed_generation(),
            last_error: Some(message.to_string()),
        };
        self.patch(status).await
    }

    async fn patch(&self, status: EntandoCustomResourceStatus) -> Result<()> {
        debug!(
            phase = %status.phase.map(|p| p.as_str()).unwrap_or(""),
            "Patching status"
        );
        let reference = self_reference(self.resource);
        self.facade
            .patch_status::<K>(&reference, merge_patch(&status)?)
            .await?;
        Ok(())
    }

    fn existing_result(&self) -> DeploymentResult {
        self.resource
            .status()
            .map(|s| s.deployment_result.clone())
            .unwrap_or_default()
    }

    fn existing_observed_generation(&self) -> Option<i64> {
        self.resource.status().and_then(|s| s.observed_generation)
    }

    /// Timestamp for entering `new_phase`: kept if the phase is unchanged,
    /// reset otherwise.
    fn phase_started_at(&self, new_phase: DeploymentPhase) -> Option<String> {
        let current_phase = self.resource.status().and_then(|s| s.phase);
        let existing = self
            .resource
            .status()
            .and_then(|s| s.phase_started_at.clone());

        if current_phase == Some(new_phase) && existing.is_some() {
            existing
        } else {
            Some(Utc::now().to_rfc3339())
        }
    }
}

/// Serialize a status as a merge patch that supersedes the previous status
/// wholesale. A merge patch leaves omitted keys untouched, so every cleared
/// field must be an explicit null: `lastError` after a successful pass, and
/// each result kind the pass did not produce.
fn merge_patch(status: &EntandoCustomResourceStatus) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(status)?;
    if let Some(fields) = value.as_object_mut() {
        for key in ["phase", "observedGeneration", "phaseStartedAt", "lastError"] {
            fields
                .entry(key)
                .or_insert(serde_json::Value::Null);
        }
        if let Some(result) = fields
            .get_mut("deploymentResult")
            .and_then(serde_json::Value::as_object_mut)
        {
            for key in ["deployment", "service", "pod", "ingress"] {
                result
                    .entry(key)
                    .or_insert(serde_json::Value::Null);
            }
        }
    }
    Ok(value)
}

/// Reference to the custom resource itself, for status addressing.
pub fn self_reference<K: EntandoCustomResource>(resource: &K) -> ResourceReference {
    ResourceReference {
        kind: K::kind(&()).into_owned(),
        namespace: resource.namespace().unwrap_or_default(),
        name: resource.name_any(),
        resource_version: resource.meta().resource_version.clone(),
    }
}

/// Check if the spec has changed by comparing observed generation
pub fn spec_changed<K: EntandoCustomResource>(resource: &K) -> bool {
    let current_generation = resource.meta().generation;
    let observed_generation = resource.status().and_then(|s| s.observed_generation);

    match (current_generation, observed_generation) {
        (Some(current), Some(observed)) => current != observed,
        (Some(_), None) => true, // Never observed, needs reconciliation
        _ => true,               // No generation, always reconcile
    }
}

/// Whether a `started` record is old enough to be treated as an abandoned
/// pass rather than an in-progress one. An unparseable or missing timestamp
/// counts as stale, so a damaged record cannot wedge the resource.
pub fn started_is_stale<K: EntandoCustomResource>(resource: &K, timeout: Duration) -> bool {
    let Some(entered) = resource
        .status()
        .and_then(|s| s.phase_started_at.as_deref())
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
    else {
        return true;
    };

    let age = Utc::now().signed_duration_since(entered.with_timezone(&Utc));
    age.to_std().map(|age| age > timeout).unwrap_or(true)
}

/// How long an in-progress `started` record may still be honored before it
/// goes stale. Zero for a missing or damaged record; the full timeout for a
/// record from the future (clock skew).
pub fn started_remaining<K: EntandoCustomResource>(resource: &K, timeout: Duration) -> Duration {
    let Some(entered) = resource
        .status()
        .and_then(|s| s.phase_started_at.as_deref())
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
    else {
        return Duration::ZERO;
    };

    let age = Utc::now().signed_duration_since(entered.with_timezone(&Utc));
    match age.to_std() {
        Ok(age) => timeout.saturating_sub(age),
        Err(_) => timeout,
    }
}
