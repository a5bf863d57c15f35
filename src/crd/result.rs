//! Aggregate of the cluster objects produced for one custom resource
//!
//! Holds references (never deep copies) to at most one Deployment, Service,
//! Pod, and Ingress. Populated by the reconciler after the cluster facade
//! confirms each object exists; never talks to the cluster itself, which
//! keeps it testable without a live or simulated cluster.
//!
//! A result is owned exclusively by the reconciliation pass that created it
//! and is superseded wholesale, not merged, on the next successful pass. The
//! owning custom resource's deletion discards it along with the referenced
//! objects via ownership-based garbage collection.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::reference::ResourceReference;

/// References to the objects created or adopted for a single custom resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deployment: Option<ResourceReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    service: Option<ResourceReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pod: Option<ResourceReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    ingress: Option<ResourceReference>,
}

impl DeploymentResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the Deployment reference. Recording the same logical object
    /// again is a no-op; a different object of the same kind overwrites
    /// (last-write-wins, only one Deployment is tracked per resource).
    pub fn record_deployment(&mut self, reference: ResourceReference) {
        Self::record(&mut self.deployment, reference);
    }

    pub fn record_service(&mut self, reference: ResourceReference) {
        Self::record(&mut self.service, reference);
    }

    pub fn record_pod(&mut self, reference: ResourceReference) {
        Self::record(&mut self.pod, reference);
    }

    pub fn record_ingress(&mut self, reference: ResourceReference) {
        Self::record(&mut self.ingress, reference);
    }

    fn record(slot: &mut Option<ResourceReference>, reference: ResourceReference) {
        match slot {
            Some(existing) if existing.same_object(&reference) => {}
            _ => *slot = Some(reference),
        }
    }

    /// Drop the Pod reference: the pass observed no matching pod, so a
    /// previously recorded one must not survive into the new result.
    pub fn clear_pod(&mut self) {
        self.pod = None;
    }

    /// Drop the Ingress reference: the resource no longer declares a public
    /// endpoint.
    pub fn clear_ingress(&mut self) {
        self.ingress = None;
    }

    /// Current Deployment reference, or absent if no Deployment was ever
    /// created for this resource. Never an error.
    pub fn deployment(&self) -> Option<&ResourceReference> {
        self.deployment.as_ref()
    }

    pub fn service(&self) -> Option<&ResourceReference> {
        self.service.as_ref()
    }

    pub fn pod(&self) -> Option<&ResourceReference> {
        self.pod.as_ref()
    }

    pub fn ingress(&self) -> Option<&ResourceReference> {
        self.ingress.as_ref()
    }

    /// All recorded references, for revalidation against the cluster.
    pub fn references(&self) -> impl Iterator<Item = &ResourceReference> {
        [
            self.deployment.as_ref(),
            self.service.as_ref(),
            self.pod.as_ref(),
            self.ingress.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}
