pub mod context;
pub mod database_reconciler;
pub mod error;
pub mod reconciler;
pub mod status;

pub use context::Context;
pub use database_reconciler::{database_error_policy, reconcile_database};
pub use error::{BackoffConfig, Error, Result};
pub use reconciler::{FINALIZER, error_policy, reconcile};
pub use status::{StatusManager, spec_changed, started_is_stale, started_remaining};
