//! Deployment lifecycle phase shared by all Entando custom resources
//!
//! The phase is stored on the status subresource as a lowercase token and
//! drives the reconciler's requeue decision via [`DeploymentPhase::requires_sync`].

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors raised when decoding enum tokens from stored custom resources.
///
/// Malformed text is surfaced to the caller, never silently defaulted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown deployment phase: '{0}'")]
    UnknownPhase(String),

    #[error("unknown DBMS vendor: '{0}'")]
    UnknownVendor(String),

    #[error("unknown compliance mode: '{0}'")]
    UnknownComplianceMode(String),
}

/// Deployment phase of a custom resource.
///
/// Exactly one phase is current per resource at any time. The phase is set to
/// `Requested` when a resource is first observed, moves to `Started` when a
/// reconciliation pass begins work, and ends in `Successful` or `Failed` when
/// the pass completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeploymentPhase {
    /// Resource observed, work not yet begun
    Requested,
    /// A reconciliation pass is in progress
    Started,
    /// The last pass completed successfully
    Successful,
    /// The last pass failed
    Failed,
}

impl DeploymentPhase {
    /// All phases, for exhaustive enumeration in tests and schemas.
    pub const ALL: [DeploymentPhase; 4] = [
        DeploymentPhase::Requested,
        DeploymentPhase::Started,
        DeploymentPhase::Successful,
        DeploymentPhase::Failed,
    ];

    /// Whether the reconciler should immediately re-poll the cluster.
    ///
    /// A freshly-started pass is assumed already in sync; every other phase,
    /// including the terminal ones, signals "check the cluster again".
    pub fn requires_sync(&self) -> bool {
        !matches!(self, DeploymentPhase::Started)
    }

    /// Lowercase wire token for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentPhase::Requested => "requested",
            DeploymentPhase::Started => "started",
            DeploymentPhase::Successful => "successful",
            DeploymentPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentPhase {
    type Err = ParseError;

    /// Case-insensitive decode of a phase token.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "requested" => Ok(DeploymentPhase::Requested),
            "started" => Ok(DeploymentPhase::Started),
            "successful" => Ok(DeploymentPhase::Successful),
            "failed" => Ok(DeploymentPhase::Failed),
            other => Err(ParseError::UnknownPhase(other.to_string())),
        }
    }
}

impl Serialize for DeploymentPhase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeploymentPhase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(D::Error::custom)
    }
}

impl schemars::JsonSchema for DeploymentPhase {
    fn schema_name() -> Cow<'static, str> {
        "DeploymentPhase".into()
    }

    fn json_schema(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::json_schema!({
            "type": "string",
            "enum": ["requested", "started", "successful", "failed"],
        })
    }
}

/// Deserialize an optional phase field, treating an empty string as absent.
///
/// Partially-initialized or legacy status records store `""` for "phase
/// unknown"; that is a deliberate non-error. Any other unknown token is a
/// hard parse error.
pub fn deserialize_optional<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DeploymentPhase>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(token) if token.is_empty() => Ok(None),
        Some(token) => token.parse().map(Some).map_err(D::Error::custom),
    }
}
