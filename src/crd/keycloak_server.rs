//! EntandoKeycloakServer custom resource
//!
//! Declares a desired identity server deployment: image, backing DBMS,
//! optional public ingress host, and TLS preference.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::phase::ParseError;
use crate::crd::status::{EntandoCustomResource, EntandoCustomResourceStatus};
use crate::crd::vendor::DbmsVendor;

/// EntandoKeycloakServer is the schema for the identity server API
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "entando.org",
    version = "v1",
    kind = "EntandoKeycloakServer",
    plural = "entandokeycloakservers",
    shortname = "eks",
    namespaced,
    status = "EntandoCustomResourceStatus",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Replicas", "type":"integer", "jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EntandoKeycloakServerSpec {
    /// Full image override; when absent the operator chooses the default
    /// Keycloak image for the configured platform version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_name: Option<String>,

    /// Backing DBMS vendor, stored as its canonical lowercase token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dbms: Option<String>,

    /// Host name to expose the server on; no Ingress is created when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ingress_host_name: Option<String>,

    /// Entando platform image version used for default images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entando_image_version: Option<String>,

    /// Whether the public endpoint terminates TLS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tls_enabled: Option<bool>,

    /// Number of server replicas
    #[serde(default = "default_replicas")]
    replicas: i32,
}

fn default_replicas() -> i32 {
    1
}

impl Default for EntandoKeycloakServerSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl EntandoKeycloakServerSpec {
    /// A spec with every optional field absent and the replica default
    /// applied, immediately valid without further initialization.
    pub fn new() -> Self {
        Self {
            image_name: None,
            dbms: None,
            ingress_host_name: None,
            entando_image_version: None,
            tls_enabled: None,
            replicas: default_replicas(),
        }
    }

    /// Store the vendor in its canonical lowercase form, however the caller
    /// spelled it in code.
    pub fn with_dbms(mut self, dbms: DbmsVendor) -> Self {
        self.dbms = Some(dbms.as_str().to_string());
        self
    }

    pub fn with_image_name(mut self, image_name: &str) -> Self {
        self.image_name = Some(image_name.to_string());
        self
    }

    pub fn with_ingress_host_name(mut self, host: &str) -> Self {
        self.ingress_host_name = Some(host.to_string());
        self
    }

    pub fn with_entando_image_version(mut self, version: &str) -> Self {
        self.entando_image_version = Some(version.to_string());
        self
    }

    pub fn with_tls_enabled(mut self, enabled: bool) -> Self {
        self.tls_enabled = Some(enabled);
        self
    }

    pub fn with_replicas(mut self, replicas: i32) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn image_name(&self) -> Option<&str> {
        self.image_name.as_deref()
    }

    /// Decode the stored vendor token. Unknown text fails closed with a
    /// [`ParseError`]; an absent vendor is not an error.
    pub fn dbms(&self) -> Result<Option<DbmsVendor>, ParseError> {
        self.dbms.as_deref().map(str::parse).transpose()
    }

    pub fn ingress_host_name(&self) -> Option<&str> {
        self.ingress_host_name.as_deref()
    }

    pub fn entando_image_version(&self) -> Option<&str> {
        self.entando_image_version.as_deref()
    }

    pub fn tls_enabled(&self) -> Option<bool> {
        self.tls_enabled
    }

    pub fn replicas(&self) -> i32 {
        self.replicas
    }
}

impl EntandoCustomResource for EntandoKeycloakServer {
    fn status(&self) -> Option<&EntandoCustomResourceStatus> {
        self.status.as_ref()
    }
}
