//! Service generation for identity servers and vendor databases

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use kube::core::ObjectMeta;

use crate::crd::{DockerVendorStrategy, EntandoDatabaseService, EntandoKeycloakServer};
use crate::resources::common::{owner_reference, standard_labels};

/// Generate the identity server Service
pub fn server_service(server: &EntandoKeycloakServer) -> Service {
    service_for(
        &format!("{}-server-service", server.name_any()),
        server.namespace(),
        standard_labels(&server.name_any(), "keycloak"),
        "server-port",
        8080,
        owner_reference(server),
    )
}

/// Generate the vendor database Service, listening on the engine's port.
pub fn database_service(database: &EntandoDatabaseService, strategy: DockerVendorStrategy) -> Service {
    service_for(
        &format!("{}-db-service", database.name_any()),
        database.namespace(),
        standard_labels(&database.name_any(), "dbms"),
        "db-port",
        strategy.port(),
        owner_reference(database),
    )
}

fn service_for(
    name: &str,
    namespace: Option<String>,
    labels: BTreeMap<String, String>,
    port_name: &str,
    port: i32,
    owner: k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference,
) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace,
            labels: Some(labels.clone()),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(labels),
            ports: Some(vec![ServicePort {
                name: Some(port_name.to_string()),
                port,
                target_port: Some(IntOrString::Int(port)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
