//! Command implementations

pub mod calculate;

pub mod info;

pub mod rules;

use clap::Args;
use branchver_core::config::{Config, Strategy};

/// Flags that override the rule set chosen by configuration.
#[derive(Args, Debug, Default, Clone)]
pub struct RuleOverrides {
    /// Preset rule set (ignored when custom rules are configured)
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Authoritative branch for the flat strategy
    #[arg(long, value_name = "BRANCH")]
    pub main_branch: Option<String>,

    /// Prefix in front of the version in tag names
    #[arg(long, value_name = "PREFIX")]
    pub tag_prefix: Option<String>,
}

impl RuleOverrides {
    /// Layer these flags over `config`.
    pub fn apply(&self, config: &Config) -> Config {
        let mut config = config.clone();
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(ref branch) = self.main_branch {
            config.main_branch = Some(branch.clone());
        }
        if let Some(ref prefix) = self.tag_prefix {
            config.tag_prefix.clone_from(prefix);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_overrides_keep_config() {
        let config = Config::default();
        assert_eq!(RuleOverrides::default().apply(&config), config);
    }

    #[test]
    fn overrides_replace_fields() {
        let overrides = RuleOverrides {
            strategy: Some(Strategy::Flow),
            main_branch: Some("trunk".to_string()),
            tag_prefix: Some(String::new()),
        };
        let config = overrides.apply(&Config::default());
        assert_eq!(config.strategy, Strategy::Flow);
        assert_eq!(config.main_branch.as_deref(), Some("trunk"));
        assert_eq!(config.tag_prefix, "");
    }
}
