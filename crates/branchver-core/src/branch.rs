//! Branch references and their derived labels.
//!
//! A [`Branch`] is just a name. Everything else (its role, the label a
//! prerelease gets when built from it) is derived from that name without
//! touching the repository.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::calculated::is_zero_padded;

/// Name of the conventional authoritative branch.
pub const MAIN: &str = "main";
/// Legacy name of the authoritative branch.
pub const MASTER: &str = "master";
/// Integration branch in flow-style repositories.
pub const DEVELOP: &str = "develop";

/// A named git branch.
///
/// Two branches are equal when their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Branch {
    name: String,
}

/// The role a branch plays, classified from its name.
///
/// Reported with a calculation for display and logs. Routing is decided by
/// the branch matching rules alone, never by the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchRole {
    /// `main` or `master`.
    Main,
    /// `develop`.
    Develop,
    /// `feature/*`.
    Feature,
    /// `hotfix/*`.
    Hotfix,
    /// `rc/*` or `release/*`.
    Release,
    /// Anything else.
    Generic,
}

impl fmt::Display for BranchRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Develop => write!(f, "develop"),
            Self::Feature => write!(f, "feature"),
            Self::Hotfix => write!(f, "hotfix"),
            Self::Release => write!(f, "release"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

impl Branch {
    /// Create a branch reference from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The `main` branch.
    pub fn main() -> Self {
        Self::new(MAIN)
    }

    /// The `master` branch.
    pub fn master() -> Self {
        Self::new(MASTER)
    }

    /// The `develop` branch.
    pub fn develop() -> Self {
        Self::new(DEVELOP)
    }

    /// The branch name as given.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Classify the branch by its name.
    pub fn role(&self) -> BranchRole {
        let name = self.name.as_str();
        if name == MAIN || name == MASTER {
            BranchRole::Main
        } else if name == DEVELOP {
            BranchRole::Develop
        } else if name.starts_with("feature/") {
            BranchRole::Feature
        } else if name.starts_with("hotfix/") {
            BranchRole::Hotfix
        } else if name.starts_with("rc/") || name.starts_with("release/") {
            BranchRole::Release
        } else {
            BranchRole::Generic
        }
    }

    /// The prerelease label derived from the name.
    ///
    /// The leading `<prefix>/` segment is removed and every character
    /// outside `[0-9A-Za-z_-]` becomes `-`: `feature/s_something*bla`
    /// gives `s_something-bla` and `someuser/sc-145300/ci-build` gives
    /// `sc-145300-ci-build`. A name without `/` is sanitized whole.
    ///
    /// A label of zero-padded digits is not a valid identifier, so it keeps
    /// its prefix (`feature/0042` gives `feature-0042`), or is prefixed with
    /// `branch-` when there is none (`07` gives `branch-07`).
    pub fn label(&self) -> String {
        let (prefix, rest) = match self.name.split_once('/') {
            Some((prefix, rest)) => (Some(prefix), rest),
            None => (None, self.name.as_str()),
        };
        let label = sanitize(rest);
        if !is_zero_padded(&label) {
            return label;
        }
        match prefix {
            Some(prefix) => format!("{}-{label}", sanitize(prefix)),
            None => format!("branch-{label}"),
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Branch {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Branch {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Replace anything outside `[0-9A-Za-z_-]` with `-`.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}
