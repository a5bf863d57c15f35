pub mod database_service;
pub mod keycloak_server;
pub mod phase;
pub mod reference;
pub mod result;
pub mod status;
pub mod vendor;

pub use database_service::{EntandoDatabaseService, EntandoDatabaseServiceSpec};
pub use keycloak_server::{EntandoKeycloakServer, EntandoKeycloakServerSpec};
pub use phase::{DeploymentPhase, ParseError};
pub use reference::ResourceReference;
pub use result::DeploymentResult;
pub use status::{EntandoCustomResource, EntandoCustomResourceStatus};
pub use vendor::{ComplianceMode, DbmsVendor, DockerVendorStrategy};
