use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("no file path given and the config is not bound to one")]
    MissingPath,

    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("config file '{0}' does not contain a mapping at the top level")]
    NotAMapping(PathBuf),

    #[error("failed to serialize config for '{path}': {reason}")]
    Serialize { path: PathBuf, reason: String },

    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
