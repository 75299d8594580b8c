//! Version vocabulary and computation.
//!
//! [`Scope`] picks the component a bump touches, [`Stage`] decides how a
//! prerelease qualifier is attached, and [`calculator`] combines them with
//! branch rules and repository state into a concrete version.

pub mod calculated;
pub mod calculator;

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use calculated::CalculatedVersion;
pub use calculator::{VersionCalculator, VersionCalculatorConfig};

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver: {0}")]
    InvalidSemver(#[from] semver::Error),

    /// No branch matching rule accepts the branch.
    #[error("no branch matching rule for {branch}")]
    NoMatchingBranchRule {
        /// The branch that went unmatched.
        branch: String,
    },

    /// The target branch has no version and is not a root branch.
    #[error("no version found on branch {branch}")]
    MissingVersion {
        /// The target branch without a version.
        branch: String,
    },

    /// Unknown scope token.
    #[error("invalid scope {0:?} (expected major, minor, or patch)")]
    InvalidScope(String),

    /// Unknown stage token.
    #[error("invalid stage {0:?} (expected alpha, beta, rc, final, snapshot, or branch)")]
    InvalidStage(String),

    /// A branch rule pattern is not a valid regular expression.
    #[error("invalid branch pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// Regex compile error.
        source: regex::Error,
    },

    /// A label cannot be used as a prerelease identifier.
    #[error("invalid prerelease {value:?}: {reason}")]
    InvalidPrerelease {
        /// The rejected prerelease text.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Build metadata text is not a list of valid identifiers.
    #[error("invalid build metadata {value:?}: {reason}")]
    InvalidBuildMetadata {
        /// The rejected build text.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Bumping would overflow a version component.
    #[error("cannot bump {scope} of {version}: component would overflow")]
    Overflow {
        /// The version being bumped.
        version: String,
        /// The component that overflowed.
        scope: Scope,
    },

    /// A non-authoritative branch resolved to an empty label.
    #[error("branch {branch} needs a prerelease label but its rule provides none")]
    EmptyLabel {
        /// The branch being versioned.
        branch: String,
    },

    /// The repository could not be queried.
    #[error("git error: {0}")]
    Collaborator(#[from] crate::git::GitError),
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Which component of a version a bump increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

impl FromStr for Scope {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            _ => Err(VersionError::InvalidScope(s.to_string())),
        }
    }
}

/// Release channel, controlling the prerelease qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// `alpha.<count>`.
    Alpha,
    /// `beta.<count>`.
    Beta,
    /// `rc.<count>`.
    Rc,
    /// No prerelease at all.
    Final,
    /// `SNAPSHOT`, never counted.
    Snapshot,
    /// The branch label, counted.
    Branch,
}

impl Stage {
    /// Whether this stage takes a `.<count>` qualifier.
    pub const fn is_counted(self) -> bool {
        !matches!(self, Self::Final | Self::Snapshot)
    }

    /// The prerelease label for `branch` at this stage.
    ///
    /// Returns `None` for [`Stage::Final`].
    pub fn label(self, branch: &crate::branch::Branch) -> Option<String> {
        match self {
            Self::Alpha => Some("alpha".to_string()),
            Self::Beta => Some("beta".to_string()),
            Self::Rc => Some("rc".to_string()),
            Self::Snapshot => Some("SNAPSHOT".to_string()),
            Self::Branch => Some(branch.label()),
            Self::Final => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alpha => write!(f, "alpha"),
            Self::Beta => write!(f, "beta"),
            Self::Rc => write!(f, "rc"),
            Self::Final => write!(f, "final"),
            Self::Snapshot => write!(f, "snapshot"),
            Self::Branch => write!(f, "branch"),
        }
    }
}

impl FromStr for Stage {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alpha" => Ok(Self::Alpha),
            "beta" => Ok(Self::Beta),
            "rc" => Ok(Self::Rc),
            "final" => Ok(Self::Final),
            "snapshot" => Ok(Self::Snapshot),
            "branch" => Ok(Self::Branch),
            _ => Err(VersionError::InvalidStage(s.to_string())),
        }
    }
}

/// Compute the next version by applying a scope.
///
/// Lower components reset; prerelease and build metadata are dropped.
pub fn next_version(current: &Version, scope: Scope) -> VersionResult<Version> {
    let next = match scope {
        Scope::Patch => current
            .patch
            .checked_add(1)
            .map(|patch| Version::new(current.major, current.minor, patch)),
        Scope::Minor => current
            .minor
            .checked_add(1)
            .map(|minor| Version::new(current.major, minor, 0)),
        Scope::Major => current.major.checked_add(1).map(|major| Version::new(major, 0, 0)),
    };
    next.ok_or_else(|| VersionError::Overflow {
        version: current.to_string(),
        scope,
    })
}

/// Parse a version string, stripping an optional `v` prefix.
pub fn parse_version(s: &str) -> VersionResult<Version> {
    let s = s.trim();
    let s = s.strip_prefix('v').unwrap_or(s);
    Ok(Version::parse(s)?)
}

/// Append `.<count>` to the prerelease of `version` unless `stage` forbids it.
///
/// `commits` runs only when a count is actually needed.
pub fn qualify<F>(
    stage: Option<Stage>,
    version: CalculatedVersion,
    commits: F,
) -> VersionResult<CalculatedVersion>
where
    F: FnOnce() -> VersionResult<u64>,
{
    if stage.is_some_and(|s| !s.is_counted()) {
        return Ok(version);
    }

    let count = commits()?;
    let qualified = if version.pre().is_empty() {
        count.to_string()
    } else {
        format!("{}.{count}", version.pre())
    };
    version.with_pre(&qualified)
}
