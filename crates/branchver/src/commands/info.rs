//! Info command — show package, config, and repository information.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use branchver_core::config::{self, Config};
use branchver_core::{GitContextProvider, git};

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_config_dir: Option<String>,
    log_level: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    strategy: &'static str,
    custom_rules: usize,
    tag_prefix: String,
    initial_version: String,
}

impl ConfigInfo {
    fn from_config(config: &Config, cwd: &camino::Utf8Path) -> Self {
        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            user_config_dir: config::user_config_dir().map(|p| p.to_string()),
            log_level: config.log_level.as_str(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            strategy: config.strategy.as_str(),
            custom_rules: config.branch_matching.as_ref().map_or(0, Vec::len),
            tag_prefix: config.tag_prefix.clone(),
            initial_version: config.initial_version.clone(),
        }
    }
}

#[derive(Serialize)]
struct RepositoryInfo {
    inside_repo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_tags: Option<usize>,
}

impl RepositoryInfo {
    fn gather(config: &Config) -> Self {
        let inside_repo = git::is_inside_repo().unwrap_or(false);
        if !inside_repo {
            return Self {
                inside_repo,
                branch: None,
                version_tags: None,
            };
        }
        Self {
            inside_repo,
            branch: git::current_branch().ok().flatten(),
            version_tags: GitContextProvider::discover(&config.tag_prefix)
                .ok()
                .map(|provider| provider.tags().len()),
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
    repository: RepositoryInfo,
}

/// Print package information.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory for config discovery
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, cwd),
        repository: RepositoryInfo::gather(config),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{} {}", info.package.name.bold(), info.package.version.green());
    if !info.package.description.is_empty() {
        println!("{}", info.package.description);
    }
    if !info.package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), info.package.license);
    }
    if !info.package.repository.is_empty() {
        println!("{}: {}", "Repository".dimmed(), info.package.repository.cyan());
    }

    println!();
    println!("{}", "Configuration".bold().underline());
    match info.config.config_file {
        Some(ref path) => println!("{}: {}", "Config file".dimmed(), path.cyan()),
        None => println!("{}: {}", "Config file".dimmed(), "none loaded".yellow()),
    }
    println!("{}: {}", "Log level".dimmed(), info.config.log_level);
    if let Some(ref dir) = info.config.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    if info.config.custom_rules > 0 {
        println!("{}: {} custom", "Rules".dimmed(), info.config.custom_rules);
    } else {
        println!("{}: {}", "Strategy".dimmed(), info.config.strategy.cyan());
    }
    println!("{}: {:?}", "Tag prefix".dimmed(), info.config.tag_prefix);
    println!("{}: {}", "Initial version".dimmed(), info.config.initial_version);

    println!();
    println!("{}", "Repository".bold().underline());
    if info.repository.inside_repo {
        match info.repository.branch {
            Some(ref branch) => println!("{}: {}", "Branch".dimmed(), branch.cyan()),
            None => println!("{}: {}", "Branch".dimmed(), "detached HEAD".yellow()),
        }
        if let Some(count) = info.repository.version_tags {
            println!("{}: {}", "Version tags".dimmed(), count);
        }
    } else {
        println!("  {} {}", "○".yellow(), "Not inside a git repository".yellow());
    }

    Ok(())
}
