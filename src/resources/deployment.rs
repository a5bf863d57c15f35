//! Deployment generation for identity servers and vendor databases

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::ResourceExt;
use kube::core::ObjectMeta;

use crate::config::OperatorConfig;
use crate::crd::{DockerVendorStrategy, EntandoDatabaseService, EntandoKeycloakServer};
use crate::resources::common::{owner_reference, standard_labels};

/// Default Keycloak image repository, tagged with the platform version
const DEFAULT_SERVER_IMAGE: &str = "docker.io/entando/entando-keycloak";

/// Container port Keycloak listens on
const SERVER_PORT: i32 = 8080;

/// Image to run for an identity server: the spec's override wins, otherwise
/// the default image tagged with the spec's platform version or the
/// operator-wide default.
pub fn server_image(server: &EntandoKeycloakServer, config: &OperatorConfig) -> String {
    match server.spec.image_name() {
        Some(image) => image.to_string(),
        None => format!(
            "{}:{}",
            DEFAULT_SERVER_IMAGE,
            server
                .spec
                .entando_image_version()
                .unwrap_or(&config.default_image_version)
        ),
    }
}

/// Generate the identity server Deployment
pub fn server_deployment(server: &EntandoKeycloakServer, config: &OperatorConfig) -> Deployment {
    let name = server.name_any();
    let labels = standard_labels(&name, "keycloak");

    let mut env = vec![EnvVar {
        name: "KEYCLOAK_HTTP_PORT".to_string(),
        value: Some(SERVER_PORT.to_string()),
        ..Default::default()
    }];
    if server.spec.tls_enabled().unwrap_or(false) {
        // Behind a TLS-terminating ingress Keycloak must trust forwarded
        // proto headers
        env.push(EnvVar {
            name: "PROXY_ADDRESS_FORWARDING".to_string(),
            value: Some("true".to_string()),
            ..Default::default()
        });
    }

    let container = Container {
        name: "server-container".to_string(),
        image: Some(server_image(server, config)),
        ports: Some(vec![ContainerPort {
            container_port: SERVER_PORT,
            name: Some("server-port".to_string()),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        env: Some(env),
        ..Default::default()
    };

    deployment_for(
        &format!("{}-server-deployment", name),
        server.namespace(),
        server.spec.replicas(),
        labels,
        container,
        owner_reference(server),
    )
}

/// Generate the vendor database Deployment.
///
/// The image comes from the resolved vendor/compliance strategy unless the
/// spec names an explicit override.
pub fn database_deployment(
    database: &EntandoDatabaseService,
    strategy: DockerVendorStrategy,
) -> Deployment {
    let name = database.name_any();
    let labels = standard_labels(&name, "dbms");

    let image = database
        .spec
        .image_name()
        .map(str::to_string)
        .unwrap_or_else(|| strategy.qualified_image());

    let container = Container {
        name: "db-container".to_string(),
        image: Some(image),
        ports: Some(vec![ContainerPort {
            container_port: strategy.port(),
            name: Some("db-port".to_string()),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        ..Default::default()
    };

    deployment_for(
        &format!("{}-db-deployment", name),
        database.namespace(),
        database.spec.replicas(),
        labels,
        container,
        owner_reference(database),
    )
}

fn deployment_for(
    name: &str,
    namespace: Option<String>,
    replicas: i32,
    labels: BTreeMap<String, String>,
    container: Container,
    owner: k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference,
) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace,
            labels: Some(labels.clone()),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
