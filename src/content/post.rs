//! Post model

use std::collections::HashMap;

use super::Headers;
use crate::error::Result;

/// A knowledge post: markdown text, header fields and attached images
#[derive(Debug, Clone, Default)]
pub struct Post {
    /// Header fields
    pub headers: Headers,

    /// Raw markdown, front-matter included
    text: String,

    /// Image bytes keyed by the path the markdown references them with
    images: HashMap<String, Vec<u8>>,
}

impl Post {
    /// Create a post from its parts
    pub fn new(text: impl Into<String>, headers: Headers) -> Self {
        Self {
            headers,
            text: text.into(),
            images: HashMap::new(),
        }
    }

    /// Create a post from markdown, reading headers from its front-matter
    pub fn from_markdown(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let headers = Headers::parse(&text)?;
        Ok(Self::new(text, headers))
    }

    /// Attach an image
    pub fn with_image(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.images.insert(name.into(), data);
        self
    }

    pub fn insert_image(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.images.insert(name.into(), data);
    }

    /// Raw markdown text
    pub fn read(&self) -> &str {
        &self.text
    }

    /// Images keyed by reference name
    pub fn images(&self) -> &HashMap<String, Vec<u8>> {
        &self.images
    }
}
