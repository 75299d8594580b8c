//! Branch matching rules.
//!
//! A rule routes a branch name to the target branch its version is derived
//! from, plus the label and bump applied on the way. Rules are evaluated in
//! order; the first rule whose pattern matches the *whole* branch name wins.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use semver::Version;
use tracing::{debug, instrument};

use crate::branch::Branch;
use crate::version::{Scope, VersionError, VersionResult, next_version};

/// Prerelease label text produced for a branch.
pub type PreReleaseLabel = String;
/// Build metadata text produced for a branch.
pub type BuildMetadataLabel = String;

/// Placeholder replaced by the branch's label in label templates.
pub const BRANCH_PLACEHOLDER: &str = "{branch}";

/// Computes the prerelease and build labels for a branch.
#[derive(Clone)]
pub struct LabelResolver {
    description: String,
    resolve: Arc<dyn Fn(&Branch) -> (PreReleaseLabel, BuildMetadataLabel) + Send + Sync>,
}

impl LabelResolver {
    /// Wrap an arbitrary resolver. `description` is shown when listing rules.
    pub fn new<F>(description: impl Into<String>, resolve: F) -> Self
    where
        F: Fn(&Branch) -> (PreReleaseLabel, BuildMetadataLabel) + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            resolve: Arc::new(resolve),
        }
    }

    /// No prerelease, no build metadata.
    pub fn none() -> Self {
        Self::new("", |_| (String::new(), String::new()))
    }

    /// The same prerelease word for every branch.
    pub fn fixed(word: impl Into<String>) -> Self {
        let word = word.into();
        Self::new(word.clone(), move |_| (word.clone(), String::new()))
    }

    /// The branch's label, see [`Branch::label`].
    pub fn branch() -> Self {
        Self::new(BRANCH_PLACEHOLDER, |branch| (branch.label(), String::new()))
    }

    /// Prerelease and build templates where `{branch}` expands to the
    /// branch's label.
    pub fn template(pre: impl Into<String>, build: impl Into<String>) -> Self {
        let pre = pre.into();
        let build = build.into();
        let description = if build.is_empty() {
            pre.clone()
        } else {
            format!("{pre}+{build}")
        };
        Self::new(description, move |branch| {
            let name = branch.label();
            (
                pre.replace(BRANCH_PLACEHOLDER, &name),
                build.replace(BRANCH_PLACEHOLDER, &name),
            )
        })
    }

    /// Resolve labels for `branch`.
    pub fn resolve(&self, branch: &Branch) -> (PreReleaseLabel, BuildMetadataLabel) {
        (self.resolve)(branch)
    }

    /// Human-readable form of the label.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for LabelResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LabelResolver").field(&self.description).finish()
    }
}

/// Turns a target branch's version into the base of the new version.
#[derive(Clone)]
pub struct VersionModifier {
    description: String,
    apply: Arc<dyn Fn(&Version) -> VersionResult<Version> + Send + Sync>,
}

impl VersionModifier {
    /// Wrap an arbitrary modifier. `description` is shown when listing rules.
    pub fn new<F>(description: impl Into<String>, apply: F) -> Self
    where
        F: Fn(&Version) -> VersionResult<Version> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            apply: Arc::new(apply),
        }
    }

    /// Bump the component selected by `scope`.
    pub fn scope(scope: Scope) -> Self {
        Self::new(scope.to_string(), move |version| next_version(version, scope))
    }

    /// Apply the modifier.
    pub fn apply(&self, version: &Version) -> VersionResult<Version> {
        (self.apply)(version)
    }

    /// Human-readable form of the modifier.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Default for VersionModifier {
    fn default() -> Self {
        Self::scope(Scope::Patch)
    }
}

impl fmt::Debug for VersionModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VersionModifier").field(&self.description).finish()
    }
}

/// One routing rule.
#[derive(Debug, Clone)]
pub struct BranchMatchingRule {
    source: String,
    pattern: Regex,
    target: Branch,
    label: LabelResolver,
    modifier: VersionModifier,
}

impl BranchMatchingRule {
    /// Compile a rule sending branches matching `pattern` to `target`.
    ///
    /// The pattern must match the entire branch name; `^` and `$` anchors
    /// are accepted but not required. The rule starts with no label and a
    /// patch bump.
    pub fn new(pattern: &str, target: impl Into<Branch>) -> VersionResult<Self> {
        let anchored = format!("^(?:{pattern})$");
        let compiled = Regex::new(&anchored).map_err(|source| VersionError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source: pattern.to_string(),
            pattern: compiled,
            target: target.into(),
            label: LabelResolver::none(),
            modifier: VersionModifier::default(),
        })
    }

    /// Replace the label resolver.
    #[must_use]
    pub fn with_label(mut self, label: LabelResolver) -> Self {
        self.label = label;
        self
    }

    /// Replace the version modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: VersionModifier) -> Self {
        self.modifier = modifier;
        self
    }

    /// Whether the rule accepts `branch`.
    pub fn matches(&self, branch: &Branch) -> bool {
        self.pattern.is_match(branch.name())
    }

    /// The pattern as written.
    pub fn pattern(&self) -> &str {
        &self.source
    }

    /// Branch whose version this rule builds on.
    pub const fn target(&self) -> &Branch {
        &self.target
    }

    /// The rule's label resolver.
    pub const fn label(&self) -> &LabelResolver {
        &self.label
    }

    /// The rule's version modifier.
    pub const fn modifier(&self) -> &VersionModifier {
        &self.modifier
    }
}

/// Find the first rule accepting `branch`.
#[instrument(skip_all, fields(branch = %branch, rules = rules.len()))]
pub fn resolve<'r>(
    branch: &Branch,
    rules: &'r [BranchMatchingRule],
) -> VersionResult<&'r BranchMatchingRule> {
    let rule = rules
        .iter()
        .find(|rule| rule.matches(branch))
        .ok_or_else(|| VersionError::NoMatchingBranchRule {
            branch: branch.to_string(),
        })?;
    debug!(pattern = rule.pattern(), target = %rule.target(), "matched branch rule");
    Ok(rule)
}

/// Whether `branch` is the root of the rule graph: its own rule targets itself.
pub fn is_root(branch: &Branch, rules: &[BranchMatchingRule]) -> bool {
    rules
        .iter()
        .find(|rule| rule.matches(branch))
        .is_some_and(|rule| rule.target() == branch)
}

/// Trunk-based rules around a single authoritative branch.
///
/// - `<main>` builds on itself with no label.
/// - `rc/*` builds on `<main>` labeled `rc`.
/// - Everything else builds on `<main>` labeled with the branch name.
pub fn flat_strategy(
    main: &Branch,
    modifier: &VersionModifier,
) -> VersionResult<Vec<BranchMatchingRule>> {
    Ok(vec![
        BranchMatchingRule::new(&regex::escape(main.name()), main.clone())?
            .with_modifier(modifier.clone()),
        BranchMatchingRule::new("rc/.*", main.clone())?
            .with_label(LabelResolver::fixed("rc"))
            .with_modifier(modifier.clone()),
        BranchMatchingRule::new(".*", main.clone())?
            .with_label(LabelResolver::branch())
            .with_modifier(modifier.clone()),
    ])
}

/// [`flat_strategy`] around `main`.
pub fn main_based_flat_strategy(
    modifier: &VersionModifier,
) -> VersionResult<Vec<BranchMatchingRule>> {
    flat_strategy(&Branch::main(), modifier)
}

/// [`flat_strategy`] around `master`.
pub fn master_based_flat_strategy(
    modifier: &VersionModifier,
) -> VersionResult<Vec<BranchMatchingRule>> {
    flat_strategy(&Branch::master(), modifier)
}

/// Git-flow rules: `develop` integrates into `main`, features branch off
/// `develop`, hotfixes and release candidates off `main`.
pub fn flow_strategy(modifier: &VersionModifier) -> VersionResult<Vec<BranchMatchingRule>> {
    let main = Branch::main();
    let develop = Branch::develop();
    Ok(vec![
        BranchMatchingRule::new("main", main.clone())?.with_modifier(modifier.clone()),
        BranchMatchingRule::new("develop", main.clone())?
            .with_label(LabelResolver::fixed("beta"))
            .with_modifier(modifier.clone()),
        BranchMatchingRule::new("rc/.*", main.clone())?
            .with_label(LabelResolver::fixed("rc"))
            .with_modifier(modifier.clone()),
        BranchMatchingRule::new("hotfix/.*", main)?
            .with_label(LabelResolver::branch())
            .with_modifier(modifier.clone()),
        BranchMatchingRule::new("feature/.*", develop.clone())?
            .with_label(LabelResolver::branch())
            .with_modifier(modifier.clone()),
        BranchMatchingRule::new(".*", develop)?
            .with_label(LabelResolver::branch())
            .with_modifier(modifier.clone()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch() -> VersionModifier {
        VersionModifier::scope(Scope::Patch)
    }

    #[test]
    fn pattern_must_match_whole_name() {
        let rule = BranchMatchingRule::new("feature/.*", Branch::develop()).unwrap();
        assert!(rule.matches(&Branch::new("feature/a")));
        assert!(!rule.matches(&Branch::new("xfeature/a")));
    }

    #[test]
    fn explicit_anchors_are_accepted() {
        let rule = BranchMatchingRule::new("^rc/.*$", Branch::main()).unwrap();
        assert!(rule.matches(&Branch::new("rc/1.0")));
        assert!(!rule.matches(&Branch::new("pre-rc/1.0")));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = BranchMatchingRule::new("feature/(", Branch::main()).unwrap_err();
        assert!(matches!(err, VersionError::InvalidPattern { pattern, .. } if pattern == "feature/("));
    }

    #[test]
    fn first_match_wins() {
        let rules = vec![
            BranchMatchingRule::new("feature/special", Branch::main())
                .unwrap()
                .with_label(LabelResolver::fixed("special")),
            BranchMatchingRule::new("feature/.*", Branch::develop())
                .unwrap()
                .with_label(LabelResolver::branch()),
        ];
        let rule = resolve(&Branch::new("feature/special"), &rules).unwrap();
        assert_eq!(rule.target(), &Branch::main());
        assert_eq!(rule.label().description(), "special");
    }

    #[test]
    fn unmatched_branch_fails() {
        let rules = vec![BranchMatchingRule::new("main", Branch::main()).unwrap()];
        let err = resolve(&Branch::new("someuser/abc"), &rules).unwrap_err();
        assert!(matches!(err, VersionError::NoMatchingBranchRule { branch } if branch == "someuser/abc"));
    }

    #[test]
    fn flat_routes_everything_to_main() {
        let rules = main_based_flat_strategy(&patch()).unwrap();

        let main = resolve(&Branch::main(), &rules).unwrap();
        assert_eq!(main.target(), &Branch::main());
        assert_eq!(main.label().resolve(&Branch::main()).0, "");

        let rc = Branch::new("rc/fix-1");
        assert_eq!(resolve(&rc, &rules).unwrap().label().resolve(&rc).0, "rc");

        let feature = Branch::new("feature/my_weird_feature");
        let rule = resolve(&feature, &rules).unwrap();
        assert_eq!(rule.target(), &Branch::main());
        assert_eq!(rule.label().resolve(&feature).0, "my_weird_feature");
    }

    #[test]
    fn master_flat_treats_main_as_ordinary_branch() {
        let rules = master_based_flat_strategy(&patch()).unwrap();
        assert!(is_root(&Branch::master(), &rules));
        assert!(!is_root(&Branch::main(), &rules));
        let main = Branch::main();
        assert_eq!(resolve(&main, &rules).unwrap().label().resolve(&main).0, "main");
    }

    #[test]
    fn flow_routes_features_to_develop() {
        let rules = flow_strategy(&patch()).unwrap();

        let develop = resolve(&Branch::develop(), &rules).unwrap();
        assert_eq!(develop.target(), &Branch::main());
        assert_eq!(develop.label().resolve(&Branch::develop()).0, "beta");

        let hotfix = Branch::new("hotfix/crash");
        let rule = resolve(&hotfix, &rules).unwrap();
        assert_eq!(rule.target(), &Branch::main());
        assert_eq!(rule.label().resolve(&hotfix).0, "crash");

        for name in ["feature/login", "someone/experiment"] {
            let branch = Branch::new(name);
            assert_eq!(resolve(&branch, &rules).unwrap().target(), &Branch::develop());
        }
    }

    #[test]
    fn only_main_is_root_in_flow() {
        let rules = flow_strategy(&patch()).unwrap();
        assert!(is_root(&Branch::main(), &rules));
        assert!(!is_root(&Branch::develop(), &rules));
    }

    #[test]
    fn template_label_expands_branch() {
        let label = LabelResolver::template("pr-{branch}", "sha.{branch}");
        let (pre, build) = label.resolve(&Branch::new("feature/a_b"));
        assert_eq!(pre, "pr-a_b");
        assert_eq!(build, "sha.a_b");
        assert_eq!(label.description(), "pr-{branch}+sha.{branch}");
    }

    #[test]
    fn modifier_descriptions() {
        assert_eq!(VersionModifier::scope(Scope::Minor).description(), "minor");
        let custom = VersionModifier::new("same", |v: &Version| Ok(v.clone()));
        assert_eq!(custom.apply(&Version::new(1, 0, 0)).unwrap(), Version::new(1, 0, 0));
    }

    #[test]
    fn scope_modifier_reports_overflow() {
        let top = Version::new(1, u64::MAX, 7);
        let err = VersionModifier::scope(Scope::Minor).apply(&top).unwrap_err();
        assert!(matches!(err, VersionError::Overflow { scope: Scope::Minor, .. }));
    }
}
