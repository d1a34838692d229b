//! Error types

use thiserror::Error;

/// Errors raised while loading or rendering a post
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("URL mapper failed for <{tag}> {url}: {source}")]
    Mapper {
        tag: String,
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
