//! The version a calculation reports.

use std::fmt;

use semver::Version;
use serde::{Serialize, Serializer};

use super::{VersionError, VersionResult};

/// A `major.minor.patch[-pre][+build]` version produced by a calculation.
///
/// Identifiers follow SemVer with one relaxation: `_` is accepted, so the
/// label of `feature/my_feature` stays `my_feature`. Numeric prerelease
/// identifiers still may not have leading zeros.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalculatedVersion {
    major: u64,
    minor: u64,
    patch: u64,
    pre: String,
    build: String,
}

impl CalculatedVersion {
    /// A release with no prerelease or build metadata.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: String::new(),
            build: String::new(),
        }
    }

    /// Dot-separated prerelease identifiers, empty for a release.
    pub fn pre(&self) -> &str {
        &self.pre
    }

    /// Dot-separated build identifiers, empty when absent.
    pub fn build(&self) -> &str {
        &self.build
    }

    /// Replace the prerelease. An empty string clears it.
    pub fn with_pre(mut self, pre: &str) -> VersionResult<Self> {
        check_identifiers(pre, true).map_err(|reason| VersionError::InvalidPrerelease {
            value: pre.to_string(),
            reason,
        })?;
        self.pre = pre.to_string();
        Ok(self)
    }

    /// Replace the build metadata. An empty string clears it.
    pub fn with_build(mut self, build: &str) -> VersionResult<Self> {
        check_identifiers(build, false).map_err(|reason| VersionError::InvalidBuildMetadata {
            value: build.to_string(),
            reason,
        })?;
        self.build = build.to_string();
        Ok(self)
    }

    /// Drop the prerelease, keeping build metadata.
    #[must_use]
    pub fn without_pre(mut self) -> Self {
        self.pre.clear();
        self
    }
}

impl From<&Version> for CalculatedVersion {
    fn from(version: &Version) -> Self {
        Self {
            major: version.major,
            minor: version.minor,
            patch: version.patch,
            pre: version.pre.as_str().to_string(),
            build: version.build.as_str().to_string(),
        }
    }
}

impl From<Version> for CalculatedVersion {
    fn from(version: Version) -> Self {
        Self::from(&version)
    }
}

impl fmt::Display for CalculatedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

impl Serialize for CalculatedVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Validate dot-separated identifiers. The empty string has none.
fn check_identifiers(value: &str, forbid_leading_zero: bool) -> Result<(), &'static str> {
    if value.is_empty() {
        return Ok(());
    }
    for identifier in value.split('.') {
        if identifier.is_empty() {
            return Err("empty identifier");
        }
        if !identifier
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err("identifiers may contain only [0-9A-Za-z_-]");
        }
        if forbid_leading_zero && is_zero_padded(identifier) {
            return Err("numeric identifier has a leading zero");
        }
    }
    Ok(())
}

/// All digits, more than one of them, starting with `0`.
pub(crate) fn is_zero_padded(identifier: &str) -> bool {
    identifier.len() > 1
        && identifier.starts_with('0')
        && identifier.bytes().all(|b| b.is_ascii_digit())
}
