//! Rules command — list the effective branch matching rules.

use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use branchver_core::calculate::{self, RuleSummary};
use branchver_core::config::Config;
use branchver_core::Branch;

use super::RuleOverrides;

/// Arguments for the `rules` subcommand.
#[derive(Args, Debug, Default)]
pub struct RulesArgs {
    /// Also show which rule this branch name would match
    #[arg(long, value_name = "NAME")]
    pub matching: Option<String>,

    #[command(flatten)]
    pub rules: RuleOverrides,
}

#[derive(Serialize)]
struct RulesReport {
    source: &'static str,
    main_branch: String,
    rules: Vec<RuleSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matched: Option<usize>,
}

/// Print the rules a calculation would evaluate, in order.
#[instrument(name = "cmd_rules", skip_all, fields(json_output))]
pub fn cmd_rules(
    args: RulesArgs,
    global_json: bool,
    config: &Config,
    _cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing rules command");

    let config = args.rules.apply(config);
    let main = calculate::resolve_main_branch(&config);
    let rules = calculate::effective_rules(&config, &main).context("invalid branch rules")?;

    let matched = args.matching.as_deref().and_then(|name| {
        let branch = Branch::new(name);
        rules.iter().position(|rule| rule.matches(&branch))
    });

    let report = RulesReport {
        source: if config.branch_matching.is_some() {
            "config"
        } else {
            config.strategy.as_str()
        },
        main_branch: main.to_string(),
        rules: rules.iter().map(RuleSummary::from).collect(),
        matched,
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", "Rules from".dimmed(), report.source.bold());
    for (index, rule) in report.rules.iter().enumerate() {
        let marker = if report.matched == Some(index) {
            "→".green().to_string()
        } else {
            " ".to_string()
        };
        let label = if rule.label.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            rule.label.clone()
        };
        println!(
            "{marker} {:>2}. {}  {} {}  {} {}  {} {}",
            index + 1,
            rule.pattern.cyan(),
            "→".dimmed(),
            rule.target,
            "label".dimmed(),
            label,
            "bump".dimmed(),
            rule.modifier
        );
    }
    if let Some(ref name) = args.matching
        && report.matched.is_none()
    {
        println!("{} {}", "No rule matches".yellow(), name.yellow().bold());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cwd() -> camino::Utf8PathBuf {
        camino::Utf8PathBuf::from("/tmp")
    }

    #[test]
    fn lists_flat_rules() {
        let config = Config {
            main_branch: Some("main".to_string()),
            ..Config::default()
        };
        assert!(cmd_rules(RulesArgs::default(), false, &config, &cwd()).is_ok());
    }

    #[test]
    fn lists_rules_as_json_with_match() {
        let config = Config {
            main_branch: Some("main".to_string()),
            ..Config::default()
        };
        let args = RulesArgs {
            matching: Some("rc/1".to_string()),
            ..RulesArgs::default()
        };
        assert!(cmd_rules(args, true, &config, &cwd()).is_ok());
    }

    #[test]
    fn invalid_custom_rule_fails() {
        let config = Config {
            branch_matching: Some(vec![branchver_core::config::RuleConfig {
                pattern: "(".to_string(),
                target: "main".to_string(),
                label: String::new(),
                build: String::new(),
                scope: None,
            }]),
            ..Config::default()
        };
        assert!(cmd_rules(RulesArgs::default(), false, &config, &cwd()).is_err());
    }
}
