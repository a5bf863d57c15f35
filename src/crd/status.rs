//! Status subresource shared by all Entando custom resources

use k8s_openapi::NamespaceResourceScope;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::crd::phase::{self, DeploymentPhase};
use crate::crd::result::DeploymentResult;

/// Status reported by the reconciler: the current phase, the generation it
/// observed, and references to the objects it created.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntandoCustomResourceStatus {
    /// Current deployment phase; absent means "phase unknown"
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "phase::deserialize_optional"
    )]
    pub phase: Option<DeploymentPhase>,

    /// Generation of the spec the reconciler last acted on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// References to the cluster objects produced for this resource
    #[serde(default)]
    pub deployment_result: DeploymentResult,

    /// When the current phase was entered (RFC 3339); drives stale-pass detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_started_at: Option<String>,

    /// Message of the last reconciliation error, cleared on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Custom resources this operator reconciles.
///
/// Gives the generic status and reconciliation machinery access to the shared
/// status subresource without knowing the concrete kind.
pub trait EntandoCustomResource:
    kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + std::fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    fn status(&self) -> Option<&EntandoCustomResourceStatus>;

    fn phase(&self) -> Option<DeploymentPhase> {
        self.status().and_then(|s| s.phase)
    }
}
