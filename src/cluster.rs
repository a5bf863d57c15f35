//! Cluster client facade
//!
//! The reconciliation core talks to Kubernetes only through this capability.
//! Every operation is idempotent under retry: `create_or_update` uses
//! server-side apply, `patch_status` uses a merge patch, and `get` is a read,
//! so an interrupted pass can be re-run without double-creating objects.
//!
//! The facade is an explicitly constructed, passed-in dependency. Tests swap
//! in an in-memory implementation; production wires [`KubeFacade`] over a
//! `kube::Client`.

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::crd::ResourceReference;

/// Field manager name for server-side apply
pub const FIELD_MANAGER: &str = "entando-operator";

/// Failure surfaced by the facade. Not handled inside the core; the
/// reconciler marks the resource failed and retries on the next pass.
#[derive(Error, Debug)]
pub enum ClusterOperationError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("object has no name: cannot be addressed in namespace '{0}'")]
    Unnamed(String),
}

/// Namespaced object types the facade can apply and fetch.
pub trait ClusterObject:
    Resource<Scope = NamespaceResourceScope>
    + Serialize
    + DeserializeOwned
    + Clone
    + std::fmt::Debug
    + Send
    + Sync
{
}

impl<K> ClusterObject for K where
    K: Resource<Scope = NamespaceResourceScope>
        + Serialize
        + DeserializeOwned
        + Clone
        + std::fmt::Debug
        + Send
        + Sync
{
}

/// Capability interface to the cluster.
#[async_trait]
pub trait ClusterFacade: Send + Sync + 'static {
    /// Apply the desired object, creating or updating as needed, and return
    /// a reference to the live object. Safe to call again after a timeout.
    async fn create_or_update<K>(
        &self,
        desired: &K,
    ) -> Result<ResourceReference, ClusterOperationError>
    where
        K: ClusterObject,
        K::DynamicType: Default;

    /// Re-fetch the live object behind a reference, or absent if it no
    /// longer exists.
    async fn get<K>(
        &self,
        reference: &ResourceReference,
    ) -> Result<Option<K>, ClusterOperationError>
    where
        K: ClusterObject,
        K::DynamicType: Default;

    /// Merge-patch the object behind the reference; used for metadata edits
    /// such as finalizers.
    async fn patch<K>(
        &self,
        reference: &ResourceReference,
        patch: serde_json::Value,
    ) -> Result<(), ClusterOperationError>
    where
        K: ClusterObject,
        K::DynamicType: Default;

    /// Merge-patch the status subresource of the custom resource behind the
    /// given reference.
    async fn patch_status<K>(
        &self,
        reference: &ResourceReference,
        status: serde_json::Value,
    ) -> Result<(), ClusterOperationError>
    where
        K: ClusterObject,
        K::DynamicType: Default;

    /// Find one pod matching the label selector, as a reference.
    async fn find_pod(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Option<ResourceReference>, ClusterOperationError>;
}

/// Facade implementation over a real cluster connection.
#[derive(Clone)]
pub struct KubeFacade {
    client: Client,
}

impl KubeFacade {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api_for<K>(&self, namespace: &str) -> Api<K>
    where
        K: ClusterObject,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterFacade for KubeFacade {
    async fn create_or_update<K>(
        &self,
        desired: &K,
    ) -> Result<ResourceReference, ClusterOperationError>
    where
        K: ClusterObject,
        K::DynamicType: Default,
    {
        let namespace = desired.namespace().unwrap_or_default();
        let name = desired
            .meta()
            .name
            .clone()
            .ok_or_else(|| ClusterOperationError::Unnamed(namespace.clone()))?;

        let api = self.api_for::<K>(&namespace);
        let params = PatchParams::apply(FIELD_MANAGER).force();
        let applied = api.patch(&name, &params, &Patch::Apply(desired)).await?;

        debug!(
            kind = %K::kind(&K::DynamicType::default()),
            namespace = %namespace,
            name = %name,
            "Applied resource"
        );
        Ok(ResourceReference::of(&applied))
    }

    async fn get<K>(
        &self,
        reference: &ResourceReference,
    ) -> Result<Option<K>, ClusterOperationError>
    where
        K: ClusterObject,
        K::DynamicType: Default,
    {
        let api = self.api_for::<K>(&reference.namespace);
        Ok(api.get_opt(&reference.name).await?)
    }

    async fn patch<K>(
        &self,
        reference: &ResourceReference,
        patch: serde_json::Value,
    ) -> Result<(), ClusterOperationError>
    where
        K: ClusterObject,
        K::DynamicType: Default,
    {
        let api = self.api_for::<K>(&reference.namespace);
        api.patch(
            &reference.name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }

    async fn patch_status<K>(
        &self,
        reference: &ResourceReference,
        status: serde_json::Value,
    ) -> Result<(), ClusterOperationError>
    where
        K: ClusterObject,
        K::DynamicType: Default,
    {
        let api = self.api_for::<K>(&reference.namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(
            &reference.name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }

    async fn find_pod(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Option<ResourceReference>, ClusterOperationError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default().labels(label_selector))
            .await?;
        Ok(pods.items.first().map(ResourceReference::of))
    }
}
