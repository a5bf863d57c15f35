//! Ingress generation for the identity server's public endpoint
//!
//! Only built when the spec declares an `ingressHostName`; a resource with no
//! public endpoint legitimately has no Ingress.

use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use kube::ResourceExt;
use kube::core::ObjectMeta;

use crate::crd::EntandoKeycloakServer;
use crate::resources::common::{owner_reference, standard_labels};

/// Generate the identity server Ingress for the declared host name.
///
/// When TLS is enabled the host gets a TLS stanza pointing at a certificate
/// secret named after the resource.
pub fn server_ingress(server: &EntandoKeycloakServer) -> Ingress {
    let name = server.name_any();
    let host = server.spec.ingress_host_name().unwrap_or_default().to_string();

    let backend = IngressBackend {
        service: Some(IngressServiceBackend {
            name: format!("{}-server-service", name),
            port: Some(ServiceBackendPort {
                number: Some(8080),
                ..Default::default()
            }),
        }),
        ..Default::default()
    };

    let tls = server.spec.tls_enabled().unwrap_or(false).then(|| {
        vec![IngressTLS {
            hosts: Some(vec![host.clone()]),
            secret_name: Some(format!("{}-tls-secret", name)),
        }]
    });

    Ingress {
        metadata: ObjectMeta {
            name: Some(format!("{}-ingress", name)),
            namespace: server.namespace(),
            labels: Some(standard_labels(&name, "keycloak")),
            owner_references: Some(vec![owner_reference(server)]),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(host),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/auth".to_string()),
                        path_type: "Prefix".to_string(),
                        backend,
                    }],
                }),
            }]),
            tls,
            ..Default::default()
        }),
        ..Default::default()
    }
}
