//! Calculate command — print the version of the current checkout.

use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use branchver_core::calculate;
use branchver_core::config::Config;
use branchver_core::{Calculation, Scope, Stage};

use super::RuleOverrides;

/// Arguments for the `calculate` subcommand.
#[derive(Args, Debug, Default)]
pub struct CalculateArgs {
    /// Branch name to version (default: the checked-out branch)
    #[arg(short, long, value_name = "NAME")]
    pub branch: Option<String>,

    /// Force every bump to this scope
    #[arg(long, value_enum, ignore_case = true)]
    pub scope: Option<Scope>,

    /// Force the prerelease label to this stage
    #[arg(long, value_enum, ignore_case = true)]
    pub stage: Option<Stage>,

    /// Report this version without calculating
    #[arg(long, value_name = "VERSION")]
    pub override_version: Option<String>,

    /// Show how the version was derived
    #[arg(long)]
    pub explain: bool,

    #[command(flatten)]
    pub rules: RuleOverrides,
}

impl CalculateArgs {
    fn effective_config(&self, config: &Config) -> Config {
        let mut config = self.rules.apply(config);
        if let Some(scope) = self.scope {
            config.scope = Some(scope.to_string());
        }
        if let Some(stage) = self.stage {
            config.stage = Some(stage.to_string());
        }
        if let Some(ref version) = self.override_version {
            config.override_version = Some(version.clone());
        }
        config
    }
}

/// Calculate and print the version.
///
/// Plain output is the bare version on stdout so it can be captured by
/// scripts; `--explain` adds the matched rule and base version.
#[instrument(name = "cmd_calculate", skip_all, fields(json_output))]
pub fn cmd_calculate(
    args: CalculateArgs,
    global_json: bool,
    config: &Config,
    _cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, branch = ?args.branch, "executing calculate command");

    let config = args.effective_config(config);
    let calculation = calculate::calculate(&config, args.branch.as_deref())
        .context("failed to calculate version")?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&calculation)?);
    } else if args.explain {
        print_explanation(&calculation);
    } else {
        println!("{}", calculation.version);
    }

    Ok(())
}

fn print_explanation(calculation: &Calculation) {
    println!("{}: {}", "Branch".dimmed(), calculation.branch.to_string().cyan());
    println!("{}: {}", "Role".dimmed(), calculation.role);
    match (&calculation.pattern, &calculation.target) {
        (Some(pattern), Some(target)) => {
            println!("{}: {}", "Rule".dimmed(), pattern);
            println!("{}: {}", "Target".dimmed(), target.to_string().cyan());
        }
        _ => println!("{}: {}", "Rule".dimmed(), "override".yellow()),
    }
    match calculation.base_version {
        Some(ref base) => println!("{}: {}", "Base version".dimmed(), base),
        None if calculation.pattern.is_some() => {
            println!("{}: {}", "Base version".dimmed(), "none (initial)".yellow());
        }
        None => {}
    }
    println!(
        "{}: {}",
        "Version".dimmed(),
        calculation.version.to_string().green().bold()
    );
}
