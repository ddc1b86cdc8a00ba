use crate::config::ConfigError;
use crate::template::TemplateError;
use thiserror::Error;

/// Top-level error type for the konfigure library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),
}
