//! Error types for branchver-core

use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// Configuration file not found after searching all locations.
    #[error("no configuration file found")]
    NotFound,
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Any failure from loading configuration through calculating a version.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The version could not be calculated.
    #[error(transparent)]
    Version(#[from] crate::version::VersionError),

    /// The repository could not be queried.
    #[error(transparent)]
    Git(#[from] crate::git::GitError),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
