// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for spec decoding and resource generation
//!
//! These tests use proptest to generate random inputs and verify that:
//! 1. Enum token decoding never panics and fails closed on unknown text
//! 2. The vendor/compliance image matrix is total and deterministic
//! 3. Resource builders never panic for any spec the API server could store
//! 4. Recorded references keep their per-kind last-write-wins contract

use proptest::prelude::*;

use entando_operator::config::OperatorConfig;
use entando_operator::crd::{
    ComplianceMode, DbmsVendor, DeploymentPhase, DeploymentResult, DockerVendorStrategy,
    EntandoDatabaseService, EntandoDatabaseServiceSpec, EntandoKeycloakServer,
    EntandoKeycloakServerSpec, ResourceReference,
};
use entando_operator::resources::{deployment, ingress, service};

fn arb_vendor() -> impl Strategy<Value = DbmsVendor> {
    prop_oneof![Just(DbmsVendor::Mysql), Just(DbmsVendor::Postgresql)]
}

fn arb_compliance() -> impl Strategy<Value = ComplianceMode> {
    prop_oneof![Just(ComplianceMode::Community), Just(ComplianceMode::Redhat)]
}

fn arb_phase() -> impl Strategy<Value = DeploymentPhase> {
    prop_oneof![
        Just(DeploymentPhase::Requested),
        Just(DeploymentPhase::Started),
        Just(DeploymentPhase::Successful),
        Just(DeploymentPhase::Failed),
    ]
}

fn keycloak_server(spec: EntandoKeycloakServerSpec) -> EntandoKeycloakServer {
    let mut server = EntandoKeycloakServer::new("kc", spec);
    server.metadata.namespace = Some("entando".to_string());
    server.metadata.uid = Some("uid".to_string());
    server
}

fn database(spec: EntandoDatabaseServiceSpec) -> EntandoDatabaseService {
    let mut db = EntandoDatabaseService::new("db", spec);
    db.metadata.namespace = Some("entando".to_string());
    db.metadata.uid = Some("uid".to_string());
    db
}

proptest! {
    // =========================================================================
    // Token decoding
    // =========================================================================

    /// Decoding arbitrary text never panics; it either yields a known phase
    /// or a parse error.
    #[test]
    fn phase_parse_never_panics(token in ".*") {
        let _ = token.parse::<DeploymentPhase>();
    }

    /// Any casing of a valid phase token decodes to the same phase.
    #[test]
    fn phase_parse_is_case_insensitive(phase in arb_phase(), upper in any::<bool>()) {
        let token = if upper {
            phase.as_str().to_ascii_uppercase()
        } else {
            phase.as_str().to_string()
        };
        prop_assert_eq!(token.parse::<DeploymentPhase>().unwrap(), phase);
    }

    /// Serialization emits the lowercase token and round-trips.
    #[test]
    fn phase_serde_round_trip(phase in arb_phase()) {
        let json = serde_json::to_string(&phase).unwrap();
        prop_assert_eq!(&json, &format!("\"{}\"", phase.as_str()));
        let back: DeploymentPhase = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, phase);
    }

    /// Vendor decoding fails closed: anything that is not a known token is an
    /// error, never a default.
    #[test]
    fn vendor_parse_never_defaults(token in "[a-zA-Z0-9]{0,12}") {
        match token.parse::<DbmsVendor>() {
            Ok(vendor) => prop_assert_eq!(
                vendor.as_str(),
                token.to_ascii_lowercase()
            ),
            Err(_) => {
                let lowered = token.to_ascii_lowercase();
                prop_assert!(lowered != "mysql" && lowered != "postgresql");
            }
        }
    }

    // =========================================================================
    // Image strategy matrix
    // =========================================================================

    /// The matrix is total and deterministic over its whole domain.
    #[test]
    fn strategy_resolution_is_total_and_stable(
        vendor in arb_vendor(),
        compliance in arb_compliance(),
    ) {
        let first = DockerVendorStrategy::resolve(vendor, compliance);
        let second = DockerVendorStrategy::resolve(vendor, compliance);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first.vendor(), vendor);
    }

    /// The image coordinate always reflects the compliance mode's registry.
    #[test]
    fn strategy_registry_follows_compliance(
        vendor in arb_vendor(),
        compliance in arb_compliance(),
    ) {
        let strategy = DockerVendorStrategy::resolve(vendor, compliance);
        let expected_registry = match compliance {
            ComplianceMode::Community => "docker.io",
            ComplianceMode::Redhat => "registry.redhat.io",
        };
        prop_assert_eq!(strategy.registry(), expected_registry);
        prop_assert!(strategy.qualified_image().starts_with(expected_registry));
    }

    // =========================================================================
    // Resource builders
    // =========================================================================

    /// Server object builders never panic, whatever combination of optional
    /// fields the stored spec carries.
    #[test]
    fn server_builders_never_panic(
        image in proptest::option::of("[a-z0-9./-]{1,40}"),
        host in proptest::option::of("[a-z0-9.-]{1,40}"),
        version in proptest::option::of("[a-z0-9.-]{1,12}"),
        tls in proptest::option::of(any::<bool>()),
        replicas in 0i32..10,
    ) {
        let mut spec = EntandoKeycloakServerSpec::new().with_replicas(replicas);
        if let Some(image) = image.as_deref() {
            spec = spec.with_image_name(image);
        }
        if let Some(host) = host.as_deref() {
            spec = spec.with_ingress_host_name(host);
        }
        if let Some(version) = version.as_deref() {
            spec = spec.with_entando_image_version(version);
        }
        if let Some(tls) = tls {
            spec = spec.with_tls_enabled(tls);
        }

        let server = keycloak_server(spec);
        let config = OperatorConfig::default();

        let d = deployment::server_deployment(&server, &config);
        prop_assert_eq!(d.metadata.name.as_deref(), Some("kc-server-deployment"));
        let s = service::server_service(&server);
        prop_assert_eq!(s.metadata.name.as_deref(), Some("kc-server-service"));
        if server.spec.ingress_host_name().is_some() {
            let i = ingress::server_ingress(&server);
            prop_assert_eq!(i.metadata.name.as_deref(), Some("kc-ingress"));
        }
    }

    /// Database builders never panic for any matrix cell and honor an image
    /// override when one is present.
    #[test]
    fn database_builders_never_panic(
        vendor in arb_vendor(),
        compliance in arb_compliance(),
        image in proptest::option::of("[a-z0-9./-]{1,40}"),
        replicas in 0i32..10,
    ) {
        let mut spec = EntandoDatabaseServiceSpec::new(vendor).with_replicas(replicas);
        if let Some(image) = image.as_deref() {
            spec = spec.with_image_name(image);
        }
        let db = database(spec);
        let strategy = DockerVendorStrategy::resolve(vendor, compliance);

        let d = deployment::database_deployment(&db, strategy);
        let container_image = d
            .spec.as_ref().unwrap()
            .template.spec.as_ref().unwrap()
            .containers[0]
            .image.clone().unwrap();
        match image {
            Some(expected) => prop_assert_eq!(container_image, expected),
            None => prop_assert_eq!(container_image, strategy.qualified_image()),
        }

        let s = service::database_service(&db, strategy);
        prop_assert_eq!(s.metadata.name.as_deref(), Some("db-db-service"));
    }

    // =========================================================================
    // Deployment result
    // =========================================================================

    /// Re-recording the same object identity is a no-op; a different identity
    /// of the same kind supersedes the previous record.
    #[test]
    fn result_recording_is_last_write_wins(
        first_name in "[a-z][a-z0-9-]{0,20}",
        second_name in "[a-z][a-z0-9-]{0,20}",
    ) {
        let mut result = DeploymentResult::default();
        let first = ResourceReference::new("Deployment", "entando", &first_name);
        let second = ResourceReference::new("Deployment", "entando", &second_name);

        result.record_deployment(first.clone());
        result.record_deployment(second.clone());

        let recorded = result.deployment().unwrap();
        prop_assert!(recorded.same_object(&second));
        if first_name != second_name {
            prop_assert!(!recorded.same_object(&first));
        }
    }
}
