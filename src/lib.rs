//! knowledge-render: render knowledge posts to HTML
//!
//! A post is markdown with a YAML header block and a set of attached
//! images. Rendering runs the body through pulldown-cmark with a fixed set
//! of extensions (notebook cell output, math passthrough, front-matter
//! stripping and the usual markdown extras), prepends a title/metadata
//! block and finally rewrites image and link URLs.
//!
//! ```ignore
//! let post = knowledge_render::load_post("analysis.kp")?;
//! let html = knowledge_render::HtmlConverter::new()
//!     .render(&post, &RenderOptions::default(), &[])?;
//! ```

pub mod config;
pub mod content;
pub mod converter;
pub mod error;
pub mod helpers;
pub mod markdown;

pub use content::{load_post, Headers, Post};
pub use converter::{HtmlConverter, RenderOptions, UrlMapper};
pub use error::{RenderError, Result};
pub use markdown::{Extension, MarkdownEngine, EXTENSIONS};
