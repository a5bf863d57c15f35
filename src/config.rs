//! Operator configuration read from the environment at startup
//!
//! Configuration is loaded once in `main` and injected through the controller
//! context, never read from a process-wide singleton.

use std::time::Duration;

use crate::crd::{ComplianceMode, ParseError};

/// Compliance mode environment variable
const COMPLIANCE_MODE_VAR: &str = "ENTANDO_K8S_OPERATOR_COMPLIANCE_MODE";

/// Default Entando image version used when a spec names none
const DEFAULT_IMAGE_VERSION_VAR: &str = "ENTANDO_DOCKER_IMAGE_VERSION_DEFAULT";

/// Namespace scoping for the controllers
const WATCH_NAMESPACE_VAR: &str = "WATCH_NAMESPACE";

/// Operator-wide settings injected into every reconciliation pass.
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// Which base images are permitted for vendor databases
    pub compliance_mode: ComplianceMode,

    /// Image version used for default platform images
    pub default_image_version: String,

    /// Namespace to watch, or None for cluster-wide
    pub watch_namespace: Option<String>,

    /// Requeue interval for phases that require re-synchronization
    pub sync_interval: Duration,

    /// How long a pass may sit in `started` before it is considered abandoned
    pub stale_started_timeout: Duration,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            compliance_mode: ComplianceMode::Community,
            default_image_version: "6.3.2".to_string(),
            watch_namespace: None,
            sync_interval: Duration::from_secs(30),
            stale_started_timeout: Duration::from_secs(300),
        }
    }
}

impl OperatorConfig {
    /// Load configuration from the environment.
    ///
    /// A malformed compliance mode is a hard startup error, never silently
    /// defaulted; an absent one means community.
    pub fn from_env() -> Result<Self, ParseError> {
        let mut config = Self::default();

        if let Ok(mode) = std::env::var(COMPLIANCE_MODE_VAR) {
            config.compliance_mode = mode.parse()?;
        }
        if let Ok(version) = std::env::var(DEFAULT_IMAGE_VERSION_VAR) {
            config.default_image_version = version;
        }
        config.watch_namespace = std::env::var(WATCH_NAMESPACE_VAR).ok();

        Ok(config)
    }
}
