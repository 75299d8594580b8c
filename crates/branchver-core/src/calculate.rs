//! Turning a loaded [`Config`] into a calculation against the repository.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::branch::Branch;
use crate::config::{Config, RuleConfig, Strategy};
use crate::context::{ContextProvider, GitContextProvider};
use crate::error::Result;
use crate::git;
use crate::matching::{self, BranchMatchingRule, LabelResolver, VersionModifier};
use crate::version::calculator::Calculation;
use crate::version::{
    CalculatedVersion, Scope, Stage, VersionCalculator, VersionCalculatorConfig, VersionResult,
    parse_version,
};

/// A rule as shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    /// Pattern as written.
    pub pattern: String,
    /// Target branch.
    pub target: String,
    /// Label description (`{branch}` for the branch name, empty for none).
    pub label: String,
    /// Modifier description.
    pub modifier: String,
}

impl From<&BranchMatchingRule> for RuleSummary {
    fn from(rule: &BranchMatchingRule) -> Self {
        Self {
            pattern: rule.pattern().to_string(),
            target: rule.target().to_string(),
            label: rule.label().description().to_string(),
            modifier: rule.modifier().description().to_string(),
        }
    }
}

/// Pick the authoritative branch: configured, else `main`/`master` if one
/// exists locally, else `main`.
#[instrument(skip_all)]
pub fn resolve_main_branch(config: &Config) -> Branch {
    if let Some(ref name) = config.main_branch {
        return Branch::new(name.as_str());
    }
    match git::detect_release_branch() {
        Ok(Some(name)) => Branch::new(name),
        Ok(None) => Branch::main(),
        Err(err) => {
            debug!(error = %err, "could not detect release branch, assuming main");
            Branch::main()
        }
    }
}

/// The rules a calculation will use, in evaluation order.
///
/// Custom rules replace the strategy's rules entirely.
pub fn effective_rules(config: &Config, main: &Branch) -> VersionResult<Vec<BranchMatchingRule>> {
    if let Some(ref rules) = config.branch_matching {
        return rules.iter().map(compile_rule).collect();
    }
    let modifier = VersionModifier::default();
    match config.strategy {
        Strategy::Flat => matching::flat_strategy(main, &modifier),
        Strategy::Flow => matching::flow_strategy(&modifier),
    }
}

/// Build the calculator configuration, validating every token.
pub fn calculator_config(config: &Config, main: &Branch) -> VersionResult<VersionCalculatorConfig> {
    let mut calc = VersionCalculatorConfig::new(effective_rules(config, main)?);
    calc.tag_prefix.clone_from(&config.tag_prefix);
    calc.initial_version = parse_version(&config.initial_version)?;
    calc.override_version = config
        .override_version
        .as_deref()
        .map(parse_version)
        .transpose()?;
    calc.scope = config.scope.as_deref().map(str::parse::<Scope>).transpose()?;
    calc.stage = config.stage.as_deref().map(str::parse::<Stage>).transpose()?;
    Ok(calc)
}

/// Calculate the version of `branch` (default: the checked-out branch) in
/// the repository containing the working directory.
///
/// An override version is reported as is, before rules are compiled or the
/// repository is opened. The branch is then the given one, else the
/// checked-out one if there is a repository, else `HEAD`.
#[instrument(skip(config))]
pub fn calculate(config: &Config, branch: Option<&str>) -> Result<Calculation> {
    if let Some(ref version) = config.override_version {
        let version = parse_version(version)?;
        let current = match branch {
            Some(name) => Branch::new(name),
            None => git::current_branch()
                .ok()
                .flatten()
                .map_or_else(|| Branch::new("HEAD"), Branch::new),
        };
        debug!(%current, %version, "using override version");
        return Ok(Calculation::overridden(current, &version));
    }

    let main = resolve_main_branch(config);
    let calc_config = calculator_config(config, &main)?;
    let provider = GitContextProvider::discover(&calc_config.tag_prefix)?;
    let current = match branch {
        Some(name) => Branch::new(name),
        None => provider.current_branch()?,
    };
    debug!(%current, %main, "calculating");
    Ok(VersionCalculator::new(&provider, &calc_config, current).calculate()?)
}

/// Shorthand for [`calculate`] returning only the version.
pub fn calculate_version(config: &Config, branch: Option<&str>) -> Result<CalculatedVersion> {
    calculate(config, branch).map(|calculation| calculation.version)
}

fn compile_rule(rule: &RuleConfig) -> VersionResult<BranchMatchingRule> {
    let modifier = match rule.scope.as_deref() {
        Some(scope) => VersionModifier::scope(scope.parse()?),
        None => VersionModifier::default(),
    };
    Ok(BranchMatchingRule::new(&rule.pattern, rule.target.as_str())?
        .with_label(LabelResolver::template(&rule.label, &rule.build))
        .with_modifier(modifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionError;
    use semver::Version;

    fn rule(pattern: &str, target: &str, label: &str) -> RuleConfig {
        RuleConfig {
            pattern: pattern.to_string(),
            target: target.to_string(),
            label: label.to_string(),
            build: String::new(),
            scope: None,
        }
    }

    fn summaries(rules: &[BranchMatchingRule]) -> Vec<RuleSummary> {
        rules.iter().map(RuleSummary::from).collect()
    }

    #[test]
    fn flat_rules_use_configured_main() {
        let config = Config {
            main_branch: Some("trunk".to_string()),
            ..Config::default()
        };
        let main = resolve_main_branch(&config);
        assert_eq!(main, Branch::new("trunk"));

        let rules = summaries(&effective_rules(&config, &main).unwrap());
        assert_eq!(rules[0].pattern, "trunk");
        assert!(rules.iter().all(|r| r.target == "trunk"));
        assert_eq!(rules[2].label, "{branch}");
        assert_eq!(rules[2].modifier, "patch");
    }

    #[test]
    fn flow_strategy_selected() {
        let config = Config {
            strategy: Strategy::Flow,
            ..Config::default()
        };
        let rules = effective_rules(&config, &Branch::main()).unwrap();
        assert_eq!(rules.len(), 6);
        assert_eq!(rules[1].pattern(), "develop");
        assert_eq!(rules[1].label().description(), "beta");
    }

    #[test]
    fn custom_rules_replace_strategy() {
        let mut minor = rule("^rc/.*", "main", "rc");
        minor.scope = Some("minor".to_string());
        let config = Config {
            strategy: Strategy::Flow,
            branch_matching: Some(vec![rule("^main$", "main", ""), minor]),
            ..Config::default()
        };
        let rules = summaries(&effective_rules(&config, &Branch::main()).unwrap());
        assert_eq!(
            rules,
            vec![
                RuleSummary {
                    pattern: "^main$".to_string(),
                    target: "main".to_string(),
                    label: String::new(),
                    modifier: "patch".to_string(),
                },
                RuleSummary {
                    pattern: "^rc/.*".to_string(),
                    target: "main".to_string(),
                    label: "rc".to_string(),
                    modifier: "minor".to_string(),
                },
            ]
        );
    }

    #[test]
    fn bad_custom_rule_scope_is_reported() {
        let mut bad = rule(".*", "main", "{branch}");
        bad.scope = Some("giant".to_string());
        let config = Config {
            branch_matching: Some(vec![bad]),
            ..Config::default()
        };
        let err = effective_rules(&config, &Branch::main()).unwrap_err();
        assert!(matches!(err, VersionError::InvalidScope(token) if token == "giant"));
    }

    #[test]
    fn bad_custom_rule_pattern_is_reported() {
        let config = Config {
            branch_matching: Some(vec![rule("feature/[", "develop", "")]),
            ..Config::default()
        };
        let err = effective_rules(&config, &Branch::main()).unwrap_err();
        assert!(matches!(err, VersionError::InvalidPattern { .. }));
    }

    #[test]
    fn calculator_config_parses_tokens() {
        let config = Config {
            tag_prefix: "rel-".to_string(),
            initial_version: "v1.0.0".to_string(),
            scope: Some("Major".to_string()),
            stage: Some("SNAPSHOT".to_string()),
            override_version: Some("3.2.1".to_string()),
            ..Config::default()
        };
        let calc = calculator_config(&config, &Branch::main()).unwrap();
        assert_eq!(calc.tag_prefix, "rel-");
        assert_eq!(calc.initial_version, Version::new(1, 0, 0));
        assert_eq!(calc.scope, Some(Scope::Major));
        assert_eq!(calc.stage, Some(Stage::Snapshot));
        assert_eq!(calc.override_version, Some(Version::new(3, 2, 1)));
    }

    #[test]
    fn override_skips_repository_and_rules() {
        let config = Config {
            override_version: Some("v5.0.0-hand_made.1".to_string()),
            stage: Some("not-a-stage".to_string()),
            ..Config::default()
        };
        let calculation = calculate(&config, Some("feature/login")).unwrap();
        assert_eq!(calculation.branch, Branch::new("feature/login"));
        assert_eq!(calculation.role, crate::branch::BranchRole::Feature);
        assert_eq!(calculation.pattern, None);
        assert_eq!(calculation.version.to_string(), "5.0.0-hand_made.1");
    }

    #[test]
    fn invalid_override_is_reported() {
        let config = Config {
            override_version: Some("five".to_string()),
            ..Config::default()
        };
        let err = calculate_version(&config, Some("main")).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Version(VersionError::InvalidSemver(_))
        ));
    }

    #[test]
    fn calculator_config_rejects_bad_tokens() {
        let config = Config {
            stage: Some("gamma".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            calculator_config(&config, &Branch::main()),
            Err(VersionError::InvalidStage(_))
        ));

        let config = Config {
            scope: Some("tiny".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            calculator_config(&config, &Branch::main()),
            Err(VersionError::InvalidScope(_))
        ));

        let config = Config {
            initial_version: "first".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            calculator_config(&config, &Branch::main()),
            Err(VersionError::InvalidSemver(_))
        ));
    }
}
