//! Server capability probe
//!
//! Optional DDL clauses depend on the server version. The set of supported
//! features is computed once per connection and shared read-only afterwards.

use crate::error::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("version pattern is valid")
});

/// Optional server features the reconciler may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Feature {
    /// `ALLOW_CONNECTIONS` in CREATE/ALTER DATABASE
    DbAllowConnections,
    /// `IS_TEMPLATE` in CREATE/ALTER DATABASE
    DbIsTemplate,
    /// `DROP DATABASE ... WITH (FORCE)`
    ForceDropDatabase,
}

impl Feature {
    pub const ALL: [Feature; 3] = [
        Feature::DbAllowConnections,
        Feature::DbIsTemplate,
        Feature::ForceDropDatabase,
    ];

    /// First server version that supports this feature
    pub fn minimum_version(self) -> ServerVersion {
        match self {
            Feature::DbAllowConnections | Feature::DbIsTemplate => ServerVersion::new(9, 5, 0),
            Feature::ForceDropDatabase => ServerVersion::new(13, 0, 0),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feature::DbAllowConnections => "database ALLOW_CONNECTIONS",
            Feature::DbIsTemplate => "database IS_TEMPLATE",
            Feature::ForceDropDatabase => "DROP DATABASE WITH (FORCE)",
        };
        f.write_str(name)
    }
}

/// A parsed server version
///
/// Ordering ignores `raw`, which keeps the server's own text (e.g.,
/// "14.5 (Debian 14.5-1.pgdg110+1)") for error messages.
#[derive(Debug, Clone, Serialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub raw: String,
}

impl ServerVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            raw: format!("{major}.{minor}.{patch}"),
        }
    }

    /// Parse a `server_version` string
    ///
    /// Accepts "9.6.24", "14.5", "14.5 (Debian ...)", "16beta1" and similar.
    pub fn parse(raw: &str) -> Result<Self> {
        let caps = VERSION_RE
            .captures(raw)
            .ok_or_else(|| Error::InvalidVersion(raw.to_string()))?;
        let part = |i: usize| -> Result<u32> {
            caps.get(i).map_or(Ok(0), |m| {
                m.as_str()
                    .parse()
                    .map_err(|_| Error::InvalidVersion(raw.to_string()))
            })
        };

        Ok(Self {
            major: part(1)?,
            minor: part(2)?,
            patch: part(3)?,
            raw: raw.trim().to_string(),
        })
    }

    fn key(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for ServerVersion {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ServerVersion {}

impl PartialOrd for ServerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The features a specific server supports
#[derive(Debug, Clone, Serialize)]
pub struct CapabilitySet {
    version: ServerVersion,
    supported: Vec<Feature>,
}

impl CapabilitySet {
    /// Derive capabilities from a server version
    pub fn from_version(version: ServerVersion) -> Self {
        let supported = Feature::ALL
            .into_iter()
            .filter(|f| version >= f.minimum_version())
            .collect();
        Self { version, supported }
    }

    /// Parse a version string and derive capabilities from it
    pub fn probe(raw_version: &str) -> Result<Self> {
        Ok(Self::from_version(ServerVersion::parse(raw_version)?))
    }

    pub fn version(&self) -> &ServerVersion {
        &self.version
    }

    pub fn supports(&self, feature: Feature) -> bool {
        self.supported.contains(&feature)
    }

    /// Fail with `UnsupportedFeature` unless the feature is available
    pub fn require(&self, feature: Feature) -> Result<()> {
        if self.supports(feature) {
            Ok(())
        } else {
            Err(Error::UnsupportedFeature {
                feature,
                version: self.version.raw.clone(),
            })
        }
    }

    /// Feature name to availability, in declaration order
    pub fn features(&self) -> impl Iterator<Item = (Feature, bool)> + '_ {
        Feature::ALL.into_iter().map(|f| (f, self.supports(f)))
    }
}
