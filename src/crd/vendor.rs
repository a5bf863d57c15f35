//! DBMS vendor, compliance mode, and the vendor/compliance image strategy matrix
//!
//! The strategy matrix is a flat total function so the vendor/compliance
//! combinations stay auditable at a glance and testable by exhaustive
//! enumeration. Adding a vendor or compliance tier means adding a match arm,
//! not new branching logic.

use std::fmt;
use std::str::FromStr;

use crate::crd::phase::ParseError;

/// Supported database engines.
///
/// Stored on the wire as a normalized lowercase string; decoded at the
/// parsing boundary, failing closed on unknown text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DbmsVendor {
    Mysql,
    Postgresql,
}

impl DbmsVendor {
    pub const ALL: [DbmsVendor; 2] = [DbmsVendor::Mysql, DbmsVendor::Postgresql];

    /// Canonical lowercase wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            DbmsVendor::Mysql => "mysql",
            DbmsVendor::Postgresql => "postgresql",
        }
    }
}

impl fmt::Display for DbmsVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbmsVendor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(DbmsVendor::Mysql),
            "postgresql" => Ok(DbmsVendor::Postgresql),
            other => Err(ParseError::UnknownVendor(other.to_string())),
        }
    }
}

/// Deployment-tier flag controlling which base images are permitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ComplianceMode {
    /// Community images from Docker Hub
    #[default]
    Community,
    /// Red Hat certified images
    Redhat,
}

impl ComplianceMode {
    pub const ALL: [ComplianceMode; 2] = [ComplianceMode::Community, ComplianceMode::Redhat];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceMode::Community => "community",
            ComplianceMode::Redhat => "redhat",
        }
    }
}

impl fmt::Display for ComplianceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplianceMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "community" => Ok(ComplianceMode::Community),
            "redhat" => Ok(ComplianceMode::Redhat),
            other => Err(ParseError::UnknownComplianceMode(other.to_string())),
        }
    }
}

/// Concrete image strategy for one (vendor, compliance) pair.
///
/// Immutable once resolved; exposes the identity the reconciler needs to
/// render a container spec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DockerVendorStrategy {
    CentosMysql,
    RhelMysql,
    CentosPostgresql,
    RhelPostgresql,
}

impl DockerVendorStrategy {
    /// Resolve the image strategy for a vendor/compliance pair.
    ///
    /// Total over both enumerations; deterministic; no failure path. Inputs
    /// outside the closed enums cannot be expressed, the string-to-enum
    /// boundary validates before this is reached.
    pub fn resolve(vendor: DbmsVendor, compliance: ComplianceMode) -> Self {
        match (vendor, compliance) {
            (DbmsVendor::Mysql, ComplianceMode::Community) => DockerVendorStrategy::CentosMysql,
            (DbmsVendor::Mysql, ComplianceMode::Redhat) => DockerVendorStrategy::RhelMysql,
            (DbmsVendor::Postgresql, ComplianceMode::Community) => {
                DockerVendorStrategy::CentosPostgresql
            }
            (DbmsVendor::Postgresql, ComplianceMode::Redhat) => {
                DockerVendorStrategy::RhelPostgresql
            }
        }
    }

    /// Registry hosting the image.
    pub fn registry(&self) -> &'static str {
        match self {
            DockerVendorStrategy::CentosMysql | DockerVendorStrategy::CentosPostgresql => {
                "docker.io"
            }
            DockerVendorStrategy::RhelMysql | DockerVendorStrategy::RhelPostgresql => {
                "registry.redhat.io"
            }
        }
    }

    /// Image repository (organization/name) within the registry.
    pub fn image_repository(&self) -> &'static str {
        match self {
            DockerVendorStrategy::CentosMysql => "centos/mysql-80-centos7",
            DockerVendorStrategy::RhelMysql => "rhel8/mysql-80",
            DockerVendorStrategy::CentosPostgresql => "centos/postgresql-12-centos7",
            DockerVendorStrategy::RhelPostgresql => "rhel8/postgresql-12",
        }
    }

    /// Fully qualified image string for the container spec.
    pub fn qualified_image(&self) -> String {
        format!("{}/{}:latest", self.registry(), self.image_repository())
    }

    /// Port the database engine listens on.
    pub fn port(&self) -> i32 {
        match self.vendor() {
            DbmsVendor::Mysql => 3306,
            DbmsVendor::Postgresql => 5432,
        }
    }

    /// Vendor this strategy serves.
    pub fn vendor(&self) -> DbmsVendor {
        match self {
            DockerVendorStrategy::CentosMysql | DockerVendorStrategy::RhelMysql => {
                DbmsVendor::Mysql
            }
            DockerVendorStrategy::CentosPostgresql | DockerVendorStrategy::RhelPostgresql => {
                DbmsVendor::Postgresql
            }
        }
    }
}
