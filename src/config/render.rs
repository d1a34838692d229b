//! Render configuration (render.yml)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::markdown::DEFAULT_THEME;

/// Default config file name looked up in the working directory
pub const CONFIG_FILE: &str = "render.yml";

/// Main render configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Leave out the title/author/TLDR block
    pub skip_headers: bool,
    /// Inline post images as base64 data URIs
    pub embed_images: bool,
    #[serde(default)]
    pub highlight: HighlightConfig,
    /// Prefix rewrites applied to image and link URLs, in order
    #[serde(default)]
    pub url_prefixes: Vec<UrlPrefix>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            skip_headers: false,
            embed_images: true,
            highlight: HighlightConfig::default(),
            url_prefixes: Vec::new(),
        }
    }
}

impl RenderConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: RenderConfig = serde_yaml::from_str(&content)?;
        tracing::debug!("Loaded render config from {:?}", path.as_ref());
        Ok(config)
    }

    /// Load `render.yml` from a directory, falling back to defaults
    pub fn load_or_default<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Syntax highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub theme: String,
    pub line_numbers: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            line_numbers: false,
        }
    }
}

/// Rewrite URLs starting with `from` to start with `to` instead
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPrefix {
    pub from: String,
    pub to: String,
}

impl std::str::FromStr for UrlPrefix {
    type Err = String;

    /// Parse the command-line form `FROM=TO`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((from, to)) if !from.is_empty() => Ok(Self {
                from: from.to_string(),
                to: to.to_string(),
            }),
            _ => Err(format!("expected FROM=TO, got {:?}", s)),
        }
    }
}
