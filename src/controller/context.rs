use crate::cluster::ClusterFacade;
use crate::config::OperatorConfig;

/// Shared context for the controllers.
///
/// The facade and configuration are constructed once at startup and injected
/// here, so reconciliation passes stay independently testable and
/// parallelizable across distinct custom resources.
pub struct Context<F: ClusterFacade> {
    /// Cluster client facade
    pub facade: F,
    /// Operator-wide configuration
    pub config: OperatorConfig,
}

impl<F: ClusterFacade> Context<F> {
    pub fn new(facade: F, config: OperatorConfig) -> Self {
        Self { facade, config }
    }
}
