//! End-to-end reconciliation tests against the in-memory cluster facade

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::runtime::controller::Action;

use entando_operator::controller::{Context, Error, FINALIZER, reconcile, reconcile_database};
use entando_operator::crd::{
    ComplianceMode, DbmsVendor, DeploymentPhase, EntandoCustomResourceStatus,
    EntandoDatabaseServiceSpec, EntandoKeycloakServerSpec, ResourceReference,
};
use entando_operator::OperatorConfig;

use crate::common::{FakeCluster, database_service, keycloak_server};

fn context(compliance_mode: ComplianceMode) -> Arc<Context<FakeCluster>> {
    let config = OperatorConfig {
        compliance_mode,
        ..Default::default()
    };
    Arc::new(Context::new(FakeCluster::new(), config))
}

fn status_of(ctx: &Context<FakeCluster>, kind: &str, name: &str) -> EntandoCustomResourceStatus {
    let value = ctx
        .facade
        .status_of(kind, "entando", name)
        .expect("status was never patched");
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_mysql_redhat_database_gets_rhel_image() {
    let ctx = context(ComplianceMode::Redhat);
    let database = Arc::new(database_service(EntandoDatabaseServiceSpec::new(
        DbmsVendor::Mysql,
    )));

    reconcile_database(database, ctx.clone()).await.unwrap();

    let deployment = ctx
        .facade
        .object("Deployment", "entando", "my-db-db-deployment")
        .unwrap();
    let image = deployment["spec"]["template"]["spec"]["containers"][0]["image"]
        .as_str()
        .unwrap();
    assert_eq!(image, "registry.redhat.io/rhel8/mysql-80:latest");
}

#[tokio::test]
async fn test_database_pass_records_deployment_and_service_but_no_ingress() {
    let ctx = context(ComplianceMode::Community);
    let database = Arc::new(database_service(EntandoDatabaseServiceSpec::new(
        DbmsVendor::Postgresql,
    )));

    reconcile_database(database, ctx.clone()).await.unwrap();

    let status = status_of(&ctx, "EntandoDatabaseService", "my-db");
    assert_eq!(status.phase, Some(DeploymentPhase::Successful));
    assert_eq!(status.observed_generation, Some(1));

    let result = &status.deployment_result;
    assert!(result.deployment().is_some());
    assert!(result.service().is_some());
    assert!(result.ingress().is_none());
    assert_eq!(
        result.deployment().unwrap().name,
        "my-db-db-deployment"
    );
}

#[tokio::test]
async fn test_database_without_vendor_defaults_to_postgresql() {
    let ctx = context(ComplianceMode::Community);
    let spec: EntandoDatabaseServiceSpec = serde_json::from_str("{}").unwrap();
    let database = Arc::new(database_service(spec));

    reconcile_database(database, ctx.clone()).await.unwrap();

    let deployment = ctx
        .facade
        .object("Deployment", "entando", "my-db-db-deployment")
        .unwrap();
    let image = deployment["spec"]["template"]["spec"]["containers"][0]["image"]
        .as_str()
        .unwrap();
    assert_eq!(image, "docker.io/centos/postgresql-12-centos7:latest");
}

#[tokio::test]
async fn test_unknown_vendor_fails_pass_with_parse_error() {
    let ctx = context(ComplianceMode::Community);
    let spec: EntandoDatabaseServiceSpec =
        serde_json::from_str(r#"{"dbms": "oracle"}"#).unwrap();
    let database = Arc::new(database_service(spec));

    let error = reconcile_database(database, ctx.clone()).await.unwrap_err();
    assert!(matches!(error, Error::Parse(_)));
    assert!(!error.is_retryable());

    let status = status_of(&ctx, "EntandoDatabaseService", "my-db");
    assert_eq!(status.phase, Some(DeploymentPhase::Failed));
    assert!(status.last_error.unwrap().contains("oracle"));
    // Nothing was applied for the malformed spec
    assert!(!ctx.facade.has_object("Deployment", "entando", "my-db-db-deployment"));
}

#[tokio::test]
async fn test_server_without_host_name_gets_no_ingress() {
    let ctx = context(ComplianceMode::Community);
    let server = Arc::new(keycloak_server(EntandoKeycloakServerSpec::new()));

    reconcile(server, ctx.clone()).await.unwrap();

    assert!(ctx
        .facade
        .has_object("Deployment", "entando", "my-keycloak-server-deployment"));
    assert!(ctx
        .facade
        .has_object("Service", "entando", "my-keycloak-server-service"));
    assert!(!ctx.facade.has_object("Ingress", "entando", "my-keycloak-ingress"));

    let status = status_of(&ctx, "EntandoKeycloakServer", "my-keycloak");
    assert_eq!(status.phase, Some(DeploymentPhase::Successful));
    assert!(status.deployment_result.ingress().is_none());
}

#[tokio::test]
async fn test_server_with_host_name_gets_ingress_reference() {
    let ctx = context(ComplianceMode::Community);
    let server = Arc::new(keycloak_server(
        EntandoKeycloakServerSpec::new()
            .with_ingress_host_name("kc.example.com")
            .with_tls_enabled(true),
    ));

    reconcile(server, ctx.clone()).await.unwrap();

    let status = status_of(&ctx, "EntandoKeycloakServer", "my-keycloak");
    let ingress = status.deployment_result.ingress().unwrap();
    assert_eq!(ingress.kind, "Ingress");
    assert_eq!(ingress.name, "my-keycloak-ingress");
}

#[tokio::test]
async fn test_pod_reference_recorded_when_pod_exists() {
    let ctx = context(ComplianceMode::Community);
    ctx.facade.add_pod(
        "entando",
        "entando.org/deployment=my-keycloak",
        ResourceReference::new("Pod", "entando", "my-keycloak-server-deployment-abc12"),
    );
    let server = Arc::new(keycloak_server(EntandoKeycloakServerSpec::new()));

    reconcile(server, ctx.clone()).await.unwrap();

    let status = status_of(&ctx, "EntandoKeycloakServer", "my-keycloak");
    assert_eq!(
        status.deployment_result.pod().unwrap().name,
        "my-keycloak-server-deployment-abc12"
    );
}

#[tokio::test]
async fn test_successful_unchanged_resource_only_verifies_references() {
    let ctx = context(ComplianceMode::Community);

    // First pass creates everything
    let mut server = keycloak_server(EntandoKeycloakServerSpec::new());
    reconcile(Arc::new(server.clone()), ctx.clone()).await.unwrap();
    let applies_after_first_pass = ctx.facade.apply_count();

    // Feed the recorded status back, as the watch would
    let status = status_of(&ctx, "EntandoKeycloakServer", "my-keycloak");
    server.status = Some(status);

    reconcile(Arc::new(server), ctx.clone()).await.unwrap();
    assert_eq!(ctx.facade.apply_count(), applies_after_first_pass);
}

#[tokio::test]
async fn test_missing_reference_triggers_full_pass() {
    let ctx = context(ComplianceMode::Community);

    let mut server = keycloak_server(EntandoKeycloakServerSpec::new());
    reconcile(Arc::new(server.clone()), ctx.clone()).await.unwrap();

    let status = status_of(&ctx, "EntandoKeycloakServer", "my-keycloak");
    // Someone deletes the deployment out of band
    ctx.facade
        .remove(status.deployment_result.deployment().unwrap());
    server.status = Some(status);

    let applies_before = ctx.facade.apply_count();
    reconcile(Arc::new(server), ctx.clone()).await.unwrap();
    assert!(ctx.facade.apply_count() > applies_before);
    assert!(ctx
        .facade
        .has_object("Deployment", "entando", "my-keycloak-server-deployment"));
}

#[tokio::test]
async fn test_fresh_started_pass_is_left_alone() {
    let ctx = context(ComplianceMode::Community);

    let mut server = keycloak_server(EntandoKeycloakServerSpec::new());
    server.status = Some(EntandoCustomResourceStatus {
        phase: Some(DeploymentPhase::Started),
        phase_started_at: Some(Utc::now().to_rfc3339()),
        ..Default::default()
    });

    reconcile(Arc::new(server), ctx.clone()).await.unwrap();
    assert_eq!(ctx.facade.apply_count(), 0);
}

#[tokio::test]
async fn test_stale_started_pass_is_reentered() {
    let ctx = context(ComplianceMode::Community);

    let mut server = keycloak_server(EntandoKeycloakServerSpec::new());
    server.status = Some(EntandoCustomResourceStatus {
        phase: Some(DeploymentPhase::Started),
        phase_started_at: Some((Utc::now() - chrono::Duration::seconds(3600)).to_rfc3339()),
        ..Default::default()
    });

    reconcile(Arc::new(server), ctx.clone()).await.unwrap();
    assert!(ctx
        .facade
        .has_object("Deployment", "entando", "my-keycloak-server-deployment"));
    let status = status_of(&ctx, "EntandoKeycloakServer", "my-keycloak");
    assert_eq!(status.phase, Some(DeploymentPhase::Successful));
}

#[tokio::test]
async fn test_successful_pass_clears_previous_error() {
    let ctx = context(ComplianceMode::Community);

    // First pass fails on a malformed vendor and records the error
    let spec: EntandoDatabaseServiceSpec =
        serde_json::from_str(r#"{"dbms": "oracle"}"#).unwrap();
    let mut database = database_service(spec);
    reconcile_database(Arc::new(database.clone()), ctx.clone())
        .await
        .unwrap_err();
    let failed = status_of(&ctx, "EntandoDatabaseService", "my-db");
    assert!(failed.last_error.is_some());

    // The user fixes the spec; the next pass must clear the stale error,
    // merge-patch semantics notwithstanding
    database.spec = EntandoDatabaseServiceSpec::new(DbmsVendor::Postgresql);
    database.metadata.generation = Some(2);
    database.status = Some(failed);
    reconcile_database(Arc::new(database), ctx.clone()).await.unwrap();

    let status = status_of(&ctx, "EntandoDatabaseService", "my-db");
    assert_eq!(status.phase, Some(DeploymentPhase::Successful));
    assert!(status.last_error.is_none());
    assert_eq!(status.observed_generation, Some(2));
}

#[tokio::test]
async fn test_removed_host_name_drops_stale_ingress_reference() {
    let ctx = context(ComplianceMode::Community);

    let mut server = keycloak_server(
        EntandoKeycloakServerSpec::new().with_ingress_host_name("kc.example.com"),
    );
    reconcile(Arc::new(server.clone()), ctx.clone()).await.unwrap();
    let status = status_of(&ctx, "EntandoKeycloakServer", "my-keycloak");
    assert!(status.deployment_result.ingress().is_some());

    // The host name is removed from the spec; the new result supersedes the
    // old one wholesale, so the ingress reference must not survive
    server.spec = EntandoKeycloakServerSpec::new();
    server.metadata.generation = Some(2);
    server.status = Some(status);
    reconcile(Arc::new(server), ctx.clone()).await.unwrap();

    let status = status_of(&ctx, "EntandoKeycloakServer", "my-keycloak");
    assert_eq!(status.phase, Some(DeploymentPhase::Successful));
    assert!(status.deployment_result.ingress().is_none());
    assert!(status.deployment_result.deployment().is_some());
    assert!(status.deployment_result.service().is_some());
}

#[tokio::test]
async fn test_first_observation_adds_finalizer() {
    let ctx = context(ComplianceMode::Community);
    let mut server = keycloak_server(EntandoKeycloakServerSpec::new());
    server.metadata.finalizers = None;

    let action = reconcile(Arc::new(server), ctx.clone()).await.unwrap();

    assert_eq!(action, Action::requeue(Duration::from_secs(1)));
    // Nothing is deployed until the finalizer is in place
    assert_eq!(ctx.facade.apply_count(), 0);
    let patch = ctx
        .facade
        .patch_of("EntandoKeycloakServer", "entando", "my-keycloak")
        .unwrap();
    assert_eq!(patch["metadata"]["finalizers"][0], FINALIZER);
}

#[tokio::test]
async fn test_deletion_releases_finalizer() {
    let ctx = context(ComplianceMode::Community);
    let mut server = keycloak_server(EntandoKeycloakServerSpec::new());
    server.metadata.deletion_timestamp = Some(Time(Utc::now()));

    let action = reconcile(Arc::new(server), ctx.clone()).await.unwrap();

    // Owned objects are garbage-collected by the cluster; the pass only
    // drops the finalizer so deletion can complete
    assert_eq!(action, Action::await_change());
    assert_eq!(ctx.facade.apply_count(), 0);
    let patch = ctx
        .facade
        .patch_of("EntandoKeycloakServer", "entando", "my-keycloak")
        .unwrap();
    assert!(patch["metadata"]["finalizers"].is_null());
}

#[tokio::test]
async fn test_create_or_update_is_idempotent_in_facade() {
    let ctx = context(ComplianceMode::Community);
    let server = Arc::new(keycloak_server(EntandoKeycloakServerSpec::new()));

    reconcile(server.clone(), ctx.clone()).await.unwrap();
    // A retried pass re-applies the same objects without duplicating them
    reconcile(server, ctx.clone()).await.unwrap();

    let status = status_of(&ctx, "EntandoKeycloakServer", "my-keycloak");
    assert_eq!(
        status.deployment_result.deployment().unwrap().name,
        "my-keycloak-server-deployment"
    );
}
