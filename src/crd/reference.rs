//! Minimal identity of a cluster object managed by the operator
//!
//! Cluster objects are large and mutated by the platform outside the
//! operator's control (status subresources, admission webhooks), so the
//! operator records references, never snapshots. A reference carries just
//! enough identity to re-fetch the live object; it is revalidated against the
//! cluster on each use.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to one cluster object: kind, namespace, name, and optionally the
/// resource version observed when the reference was recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    pub kind: String,

    pub namespace: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl ResourceReference {
    pub fn new(kind: &str, namespace: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            resource_version: None,
        }
    }

    /// Build a reference from a live object returned by the cluster.
    pub fn of<K>(object: &K) -> Self
    where
        K: kube::Resource,
        K::DynamicType: Default,
    {
        let meta = object.meta();
        Self {
            kind: K::kind(&K::DynamicType::default()).into_owned(),
            namespace: meta.namespace.clone().unwrap_or_default(),
            name: meta.name.clone().unwrap_or_default(),
            resource_version: meta.resource_version.clone(),
        }
    }

    /// Whether two references identify the same logical object, ignoring the
    /// resource version (which changes on every cluster-side write).
    pub fn same_object(&self, other: &ResourceReference) -> bool {
        self.kind == other.kind && self.namespace == other.namespace && self.name == other.name
    }
}

impl std::fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}
