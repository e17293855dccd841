//! Version policy — decides whether a node version can serve this application.
//!
//! Pure functions, no state beyond the configured strictness. Anything that
//! does not parse as `MAJOR.MINOR.PATCH` after qualifier stripping fails closed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How much of the version must match for a node to be compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStrictness {
    /// Major, minor and patch must all match.
    Strict,
    /// Only the major version must match.
    #[default]
    MajorOnly,
}

impl FromStr for VersionStrictness {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(Self::Strict),
            "major_only" | "major" => Ok(Self::MajorOnly),
            _ => Err(ConfigError::InvalidStrictness(s.to_string())),
        }
    }
}

impl fmt::Display for VersionStrictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::MajorOnly => f.write_str("major_only"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionPolicy {
    strictness: VersionStrictness,
}

impl VersionPolicy {
    pub fn new(strictness: VersionStrictness) -> Self {
        Self { strictness }
    }

    pub fn strictness(&self) -> VersionStrictness {
        self.strictness
    }

    /// Whether a node running `node_version` can serve `app_version`.
    pub fn is_compatible(&self, node_version: &str, app_version: &str) -> bool {
        let (Some(node), Some(app)) = (parse_core_version(node_version), parse_core_version(app_version))
        else {
            return false;
        };

        match self.strictness {
            VersionStrictness::Strict => same_release(&node, &app),
            VersionStrictness::MajorOnly => node.major == app.major,
        }
    }

    /// Compatible and on the same release, so no upgrade warning is needed.
    pub fn is_equal(&self, node_version: &str, app_version: &str) -> bool {
        if !self.is_compatible(node_version, app_version) {
            return false;
        }
        match (parse_core_version(node_version), parse_core_version(app_version)) {
            (Some(node), Some(app)) => same_release(&node, &app),
            _ => false,
        }
    }
}

fn same_release(a: &semver::Version, b: &semver::Version) -> bool {
    (a.major, a.minor, a.patch) == (b.major, b.minor, b.patch)
}

/// Parse the `MAJOR.MINOR.PATCH` core of a version string.
///
/// Everything after the first `-` is treated as a qualifier (`-SNAPSHOT`,
/// `-beta1`, `-rc.2`) and dropped; build metadata after `+` is cleared.
pub fn parse_core_version(raw: &str) -> Option<semver::Version> {
    let core = raw.trim().split('-').next()?;
    if core.is_empty() {
        return None;
    }
    let mut version = semver::Version::parse(core).ok()?;
    version.pre = semver::Prerelease::EMPTY;
    version.build = semver::BuildMetadata::EMPTY;
    Some(version)
}
