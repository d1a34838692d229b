//! Post to HTML conversion

mod urls;

pub use urls::{apply_url_remapping, map_url, ImageEmbedder, PrefixMapper, UrlMapper};

use crate::content::Post;
use crate::error::{RenderError, Result};
use crate::helpers::{escape_text, isoformat};
use crate::markdown::{Extension, Highlighter, MarkdownEngine, EXTENSIONS};

/// Options for a single render
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Leave out the title/author/TLDR block
    pub skip_headers: bool,
    /// Inline post images as base64 data URIs
    pub embed_images: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            skip_headers: false,
            embed_images: true,
        }
    }
}

/// Renders posts to HTML
pub struct HtmlConverter {
    engine: MarkdownEngine,
    /// Engine for header snippets: no cell output
    snippet_engine: MarkdownEngine,
}

impl HtmlConverter {
    /// Create a converter with the standard extension set
    pub fn new() -> Self {
        Self::with_highlighter(Highlighter::new())
    }

    pub fn with_highlighter(highlighter: Highlighter) -> Self {
        let engine = MarkdownEngine::with_highlighter(EXTENSIONS, highlighter);
        let snippet_engine = engine.without(Extension::CellOutput);
        Self {
            engine,
            snippet_engine,
        }
    }

    /// Render a post to HTML
    ///
    /// Posts with a `proxy` header render as a link plus an iframe of the
    /// proxied URL. Otherwise the header block (unless skipped) and body are
    /// rendered and the URL mappers applied, image embedding first when
    /// requested.
    pub fn render(
        &self,
        post: &Post,
        options: &RenderOptions,
        url_mappers: &[&dyn UrlMapper],
    ) -> Result<String> {
        if let Some(proxy) = &post.headers.proxy {
            tracing::debug!("Rendering proxy post for {}", proxy.trim());
            return Ok(render_proxy(proxy));
        }

        let embedder = ImageEmbedder::new(post.images());
        let mut mappers: Vec<&dyn UrlMapper> = Vec::with_capacity(url_mappers.len() + 1);
        if options.embed_images {
            mappers.push(&embedder);
        }
        mappers.extend_from_slice(url_mappers);

        let mut html = String::new();
        if !options.skip_headers {
            html.push_str(&self.render_headers(post)?);
        }
        html.push_str(&self.engine.convert(post.read()));

        apply_url_remapping(&html, &mappers)
    }

    /// Render the title, metadata and TLDR block
    ///
    /// Title and authors are HTML-escaped, so markup or `&` in them shows as
    /// text. The TLDR is rendered as markdown.
    pub fn render_headers(&self, post: &Post) -> Result<String> {
        let headers = &post.headers;

        let authors = headers
            .authors
            .as_ref()
            .ok_or(RenderError::MissingHeader("authors"))?;
        let tldr = headers
            .tldr
            .as_deref()
            .ok_or(RenderError::MissingHeader("tldr"))?;
        let created_at = headers
            .created_at
            .ok_or(RenderError::MissingHeader("created_at"))?;
        let updated_at = headers
            .updated_at
            .ok_or(RenderError::MissingHeader("updated_at"))?;
        let title = headers
            .title
            .as_deref()
            .ok_or(RenderError::MissingHeader("title"))?;

        Ok(format!(
            "\n<h1>{title}</h1>\n\
             <p id='metadata'>\n\
             <strong>Author</strong>: {authors} <br>\n\
             <strong>Date Created</strong>: {created}<br>\n\
             <strong>Date Updated</strong>: {updated}<br>\n\
             <strong>Tags</strong><text>: </text><br>\n\
             <strong>TLDR</strong>: {tldr}<br>\n\
             </p>\n",
            title = escape_text(title),
            authors = escape_text(&authors.join(", ")),
            created = isoformat(&created_at),
            updated = isoformat(&updated_at),
            tldr = self.snippet_engine.convert(tldr),
        ))
    }
}

impl Default for HtmlConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Link and iframe for a post hosted elsewhere
fn render_proxy(proxy: &str) -> String {
    format!(
        "<a href=\"{0}\">Linked Post</a>\n<iframe width=100% height=800 src=\"{0}\"></iframe>",
        proxy.trim()
    )
}
