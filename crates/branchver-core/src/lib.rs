//! Core library for branchver.
//!
//! Calculates a semantic version for the current state of a git checkout
//! from its branch name, the version tags on the branch it builds on, and
//! the number of commits since it diverged.
//!
//! # Modules
//!
//! - [`branch`] - Branch references, roles, and sanitized labels
//! - [`calculate`] - Running a calculation from loaded configuration
//! - [`config`] - Configuration loading and management
//! - [`context`] - Repository state the calculator depends on
//! - [`error`] - Error types and result aliases
//! - [`git`] - Read-only git queries
//! - [`matching`] - Branch matching rules and preset strategies
//! - [`tags`] - Version tags indexed by name and commit
//! - [`version`] - Scopes, stages, and the version calculator
//!
//! # Quick Start
//!
//! ```no_run
//! use branchver_core::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .with_user_config(true)
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! let version = branchver_core::calculate::calculate_version(&config, None)
//!     .expect("Failed to calculate version");
//! println!("{version}");
//! ```
#![deny(unsafe_code)]

pub mod branch;

pub mod calculate;

pub mod config;

pub mod context;

pub mod error;

pub mod git;

pub mod matching;

pub mod tags;

pub mod version;

pub use branch::{Branch, BranchRole};
pub use config::{Config, ConfigLoader, LogLevel, Strategy};
pub use context::{ContextProvider, GitContextProvider};
pub use error::{ConfigError, ConfigResult, Error, Result};
pub use matching::{BranchMatchingRule, LabelResolver, VersionModifier};
pub use version::calculator::Calculation;
pub use version::{
    CalculatedVersion, Scope, Stage, VersionCalculator, VersionCalculatorConfig, VersionError,
    VersionResult,
};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
