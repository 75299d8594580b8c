//! The version calculation algorithm.
//!
//! Given the branch being built, the calculator:
//! 1. picks the first matching branch rule,
//! 2. reads the last version of the rule's target branch,
//! 3. applies the rule's modifier (or a forced scope),
//! 4. attaches `<label>.<commits>` unless the branch is its own target.

use semver::Version;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::{
    CalculatedVersion, Scope, Stage, VersionError, VersionResult, next_version, qualify,
};
use crate::branch::{Branch, BranchRole};
use crate::context::ContextProvider;
use crate::matching::{self, BranchMatchingRule};

/// Inputs to a calculation that do not come from the repository.
#[derive(Debug, Clone)]
pub struct VersionCalculatorConfig {
    /// Prefix stripped from tag names before parsing (default `v`).
    pub tag_prefix: String,
    /// Version of a root branch that has never been tagged.
    pub initial_version: Version,
    /// Ordered routing rules.
    pub branch_matching: Vec<BranchMatchingRule>,
    /// When set, returned as-is without consulting rules or the repository.
    pub override_version: Option<Version>,
    /// When set, replaces every rule's modifier with this bump.
    pub scope: Option<Scope>,
    /// When set, replaces every rule's label with this stage's label.
    pub stage: Option<Stage>,
}

impl VersionCalculatorConfig {
    /// Config with the given rules and defaults for everything else.
    pub fn new(branch_matching: Vec<BranchMatchingRule>) -> Self {
        Self {
            tag_prefix: "v".to_string(),
            initial_version: Version::new(0, 1, 0),
            branch_matching,
            override_version: None,
            scope: None,
            stage: None,
        }
    }
}

/// What a calculation produced and how it got there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Calculation {
    /// Branch the version was calculated for.
    pub branch: Branch,
    /// Role of `branch`, for reporting.
    pub role: BranchRole,
    /// Branch the version was derived from. `None` for overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Branch>,
    /// Pattern of the matched rule. `None` for overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Version found on the target branch, before modification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_version: Option<Version>,
    /// The calculated version.
    pub version: CalculatedVersion,
}

impl Calculation {
    /// A calculation that reports `version` as given.
    pub fn overridden(branch: Branch, version: &Version) -> Self {
        Self {
            role: branch.role(),
            branch,
            target: None,
            pattern: None,
            base_version: None,
            version: CalculatedVersion::from(version),
        }
    }
}

/// Calculates the version of one branch.
pub struct VersionCalculator<'a, P: ContextProvider + ?Sized> {
    provider: &'a P,
    config: &'a VersionCalculatorConfig,
    current: Branch,
}

impl<'a, P: ContextProvider + ?Sized> VersionCalculator<'a, P> {
    /// Prepare a calculation for `current`.
    pub const fn new(provider: &'a P, config: &'a VersionCalculatorConfig, current: Branch) -> Self {
        Self {
            provider,
            config,
            current,
        }
    }

    /// Calculate the version of the current branch.
    pub fn calculate_version(&self) -> VersionResult<CalculatedVersion> {
        self.calculate().map(|calculation| calculation.version)
    }

    /// Calculate the version, keeping the intermediate decisions.
    #[instrument(skip(self), fields(branch = %self.current))]
    pub fn calculate(&self) -> VersionResult<Calculation> {
        let current = &self.current;

        if let Some(ref version) = self.config.override_version {
            debug!(%version, "using override version");
            return Ok(Calculation::overridden(current.clone(), version));
        }

        let rules = &self.config.branch_matching;
        let rule = matching::resolve(current, rules)?;
        let target = rule.target();
        debug!(
            role = %current.role(),
            pattern = rule.pattern(),
            %target,
            "resolved branch rule"
        );

        let (base_version, version) = if current == target {
            self.authoritative(rule)?
        } else {
            self.derived(rule)?
        };

        debug!(%version, "calculated version");
        Ok(Calculation {
            branch: current.clone(),
            role: current.role(),
            target: Some(target.clone()),
            pattern: Some(rule.pattern().to_string()),
            base_version,
            version,
        })
    }

    /// The branch is its own target: bump its last version, never label it.
    fn authoritative(
        &self,
        rule: &BranchMatchingRule,
    ) -> VersionResult<(Option<Version>, CalculatedVersion)> {
        let current = &self.current;
        let Some(base) = self.provider.branch_version(current, current)? else {
            debug!(initial = %self.config.initial_version, "no version yet, using initial version");
            return Ok((None, CalculatedVersion::from(&self.config.initial_version)));
        };

        let version = CalculatedVersion::from(self.modify(rule, &base)?).without_pre();
        Ok((Some(base), version))
    }

    /// The branch builds on another: bump the target's version and qualify.
    fn derived(
        &self,
        rule: &BranchMatchingRule,
    ) -> VersionResult<(Option<Version>, CalculatedVersion)> {
        let current = &self.current;
        let target = rule.target();

        let base = match self.provider.branch_version(current, target)? {
            Some(version) => version,
            None if matching::is_root(target, &self.config.branch_matching) => {
                warn!(
                    %target,
                    initial = %self.config.initial_version,
                    "target branch has no version, using initial version"
                );
                self.config.initial_version.clone()
            }
            None => {
                return Err(VersionError::MissingVersion {
                    branch: target.to_string(),
                });
            }
        };

        let mut candidate = CalculatedVersion::from(self.modify(rule, &base)?);
        let (rule_label, build) = rule.label().resolve(current);
        let label = match self.config.stage {
            Some(stage) => stage.label(current),
            None => Some(rule_label),
        };

        candidate = match label {
            None => candidate.without_pre(),
            Some(label) if label.is_empty() => {
                return Err(VersionError::EmptyLabel {
                    branch: current.to_string(),
                });
            }
            Some(label) => candidate.with_pre(&label)?,
        };
        if !build.is_empty() {
            candidate = candidate.with_build(&build)?;
        }

        let version = qualify(self.config.stage, candidate, || {
            let commits = self.provider.commits_since_branch_point(current, target)?;
            debug!(commits, "commits since branch point");
            Ok(commits)
        })?;
        Ok((Some(base), version))
    }

    fn modify(&self, rule: &BranchMatchingRule, base: &Version) -> VersionResult<Version> {
        match self.config.scope {
            Some(scope) => next_version(base, scope),
            None => rule.modifier().apply(base),
        }
    }
}
