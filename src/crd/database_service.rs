//! EntandoDatabaseService custom resource
//!
//! Declares a vendor database to provision for the platform. The container
//! image is never named directly by the user: it is resolved from the
//! declared vendor and the operator's compliance mode.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::phase::ParseError;
use crate::crd::status::{EntandoCustomResource, EntandoCustomResourceStatus};
use crate::crd::vendor::DbmsVendor;

/// EntandoDatabaseService is the schema for the database service API
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "entando.org",
    version = "v1",
    kind = "EntandoDatabaseService",
    plural = "entandodatabaseservices",
    shortname = "eds",
    namespaced,
    status = "EntandoCustomResourceStatus",
    printcolumn = r#"{"name":"Dbms", "type":"string", "jsonPath":".spec.dbms"}"#,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EntandoDatabaseServiceSpec {
    /// DBMS vendor, stored as its canonical lowercase token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dbms: Option<String>,

    /// Full image override; when absent the vendor/compliance strategy
    /// selects the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_name: Option<String>,

    /// Number of database replicas
    #[serde(default = "default_replicas")]
    replicas: i32,
}

fn default_replicas() -> i32 {
    1
}

impl Default for EntandoDatabaseServiceSpec {
    fn default() -> Self {
        Self {
            dbms: None,
            image_name: None,
            replicas: default_replicas(),
        }
    }
}

impl EntandoDatabaseServiceSpec {
    /// Build a spec for the given vendor, storing its canonical lowercase
    /// form so persisted specs are always normalized.
    pub fn new(dbms: DbmsVendor) -> Self {
        Self {
            dbms: Some(dbms.as_str().to_string()),
            ..Default::default()
        }
    }

    pub fn with_image_name(mut self, image_name: &str) -> Self {
        self.image_name = Some(image_name.to_string());
        self
    }

    pub fn with_replicas(mut self, replicas: i32) -> Self {
        self.replicas = replicas;
        self
    }

    /// Decode the stored vendor token; unknown text fails closed.
    pub fn dbms(&self) -> Result<Option<DbmsVendor>, ParseError> {
        self.dbms.as_deref().map(str::parse).transpose()
    }

    pub fn image_name(&self) -> Option<&str> {
        self.image_name.as_deref()
    }

    pub fn replicas(&self) -> i32 {
        self.replicas
    }
}

impl EntandoCustomResource for EntandoDatabaseService {
    fn status(&self) -> Option<&EntandoCustomResourceStatus> {
        self.status.as_ref()
    }
}
