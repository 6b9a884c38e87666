//! Error types for option validation and persisted configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while validating options or reading/writing the
/// cluster config file.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A database name was empty.
    #[error("must specify a database name")]
    EmptyDbName,

    /// A database name contained a character outside `[a-zA-Z0-9_]`.
    #[error("invalid character in database name: {character}")]
    InvalidDbNameCharacter {
        /// The offending character.
        character: char,
    },

    /// A required path option was missing or not absolute.
    #[error("{label} must be an absolute path, got {path:?}")]
    PathNotAbsolute {
        /// Which option the path came from (e.g. "data path").
        label: &'static str,
        /// The value that was rejected.
        path: String,
    },

    /// A depot size string failed validation.
    #[error("invalid depot size {size:?}: {cause}")]
    InvalidDepotSize {
        /// The rejected size string.
        size: String,
        /// Why it was rejected.
        cause: String,
    },

    /// A host list option was empty.
    #[error("must specify a host or host list")]
    EmptyHostList,

    /// A semantic version string did not match `M.m.p`.
    #[error("parse error for version {version}: it is not a valid version")]
    InvalidVersion {
        /// The rejected version string.
        version: String,
    },

    /// Reading or writing the cluster config file failed.
    #[error("config file error at {path}: {source}")]
    ConfigIo {
        /// The config file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The cluster config file could not be (de)serialized.
    #[error("config file format error at {path}: {cause}")]
    ConfigFormat {
        /// The config file path.
        path: PathBuf,
        /// The underlying YAML error.
        cause: String,
    },
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
