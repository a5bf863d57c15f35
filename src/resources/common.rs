//! Common utilities for Kubernetes resource generation
//!
//! Shared labels and ownership wiring used by all generated objects so that
//! everything the operator creates is discoverable and garbage-collected
//! with its owning custom resource.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;

use crate::crd::EntandoCustomResource;

/// Operator field manager / managed-by label value
pub const MANAGED_BY: &str = "entando-operator";

/// Label tying a generated object back to its owning custom resource
pub const DEPLOYMENT_LABEL: &str = "entando.org/deployment";

/// Generate an owner reference for an Entando custom resource.
///
/// Child objects carry this so the cluster garbage-collects them when the
/// owning resource is deleted; the operator has no explicit cleanup code.
pub fn owner_reference<K: EntandoCustomResource>(owner: &K) -> OwnerReference {
    OwnerReference {
        api_version: K::api_version(&()).into_owned(),
        kind: K::kind(&()).into_owned(),
        name: owner.name_any(),
        uid: owner.meta().uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Standard labels for all objects belonging to one custom resource.
pub fn standard_labels(resource_name: &str, component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "app.kubernetes.io/name".to_string(),
            resource_name.to_string(),
        ),
        (
            "app.kubernetes.io/component".to_string(),
            component.to_string(),
        ),
        (
            "app.kubernetes.io/managed-by".to_string(),
            MANAGED_BY.to_string(),
        ),
        (DEPLOYMENT_LABEL.to_string(), resource_name.to_string()),
    ])
}
