//! URL rewriting in rendered HTML

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::collections::HashMap;

use crate::config::UrlPrefix;
use crate::error::{RenderError, Result};

lazy_static! {
    static ref IMG_RE: Regex = Regex::new(r#"<img.*?src=['"](?P<url>.*?)['"].*?>"#).unwrap();
    static ref A_RE: Regex = Regex::new(r#"<a.*?href=['"](?P<url>.*?)['"].*?>"#).unwrap();
}

/// Conditionally rewrites a URL found in rendered HTML
///
/// `tag` is the element name (`img` or `a`). `Ok(None)` leaves the URL
/// unchanged; an error aborts rendering.
pub trait UrlMapper {
    fn map_url(&self, tag: &str, url: &str) -> anyhow::Result<Option<String>>;
}

impl<F> UrlMapper for F
where
    F: Fn(&str, &str) -> anyhow::Result<Option<String>>,
{
    fn map_url(&self, tag: &str, url: &str) -> anyhow::Result<Option<String>> {
        self(tag, url)
    }
}

/// Ask each mapper in turn; the first replacement wins
pub fn map_url(mappers: &[&dyn UrlMapper], tag: &str, url: &str) -> Result<Option<String>> {
    for mapper in mappers {
        let mapped = mapper
            .map_url(tag, url)
            .map_err(|source| RenderError::Mapper {
                tag: tag.to_string(),
                url: url.to_string(),
                source,
            })?;
        if mapped.is_some() {
            return Ok(mapped);
        }
    }
    Ok(None)
}

/// Rewrite the `src` of `<img>` tags and the `href` of `<a>` tags
///
/// Only the attribute value of a matched tag changes; all other bytes are
/// copied through untouched.
pub fn apply_url_remapping(html: &str, mappers: &[&dyn UrlMapper]) -> Result<String> {
    if mappers.is_empty() {
        return Ok(html.to_string());
    }
    let html = rewrite_tag(html, "img", &IMG_RE, mappers)?;
    rewrite_tag(&html, "a", &A_RE, mappers)
}

fn rewrite_tag(html: &str, tag: &str, pattern: &Regex, mappers: &[&dyn UrlMapper]) -> Result<String> {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for caps in pattern.captures_iter(html) {
        let Some(url) = caps.name("url") else {
            continue;
        };
        if let Some(new_url) = map_url(mappers, tag, url.as_str())? {
            tracing::trace!("Rewrote <{}> {} -> {}", tag, url.as_str(), new_url);
            out.push_str(&html[last..url.start()]);
            out.push_str(&new_url);
            last = url.end();
        }
    }

    out.push_str(&html[last..]);
    Ok(out)
}

/// Replaces references to post images with base64 data URIs
pub struct ImageEmbedder<'a> {
    images: &'a HashMap<String, Vec<u8>>,
}

impl<'a> ImageEmbedder<'a> {
    pub fn new(images: &'a HashMap<String, Vec<u8>>) -> Self {
        Self { images }
    }

    /// Data URI for a known image whose MIME type the file name reveals
    ///
    /// Rendered `src` values are percent-encoded, so a URL with no exact match
    /// is looked up again in decoded form.
    pub fn embed(&self, tag: &str, url: &str) -> Option<String> {
        if tag != "img" {
            return None;
        }
        let data = match self.images.get(url) {
            Some(data) => data,
            None => {
                let decoded = percent_decode_str(url).decode_utf8().ok()?;
                self.images.get(&*decoded)?
            }
        };
        let mime = mime_guess::from_path(url).first()?;
        Some(format!("data:{};base64,{}", mime, BASE64.encode(data)))
    }
}

impl UrlMapper for ImageEmbedder<'_> {
    fn map_url(&self, tag: &str, url: &str) -> anyhow::Result<Option<String>> {
        Ok(self.embed(tag, url))
    }
}

/// Swaps a leading URL prefix, for both images and links
#[derive(Debug, Clone)]
pub struct PrefixMapper {
    prefix: UrlPrefix,
}

impl PrefixMapper {
    pub fn new(prefix: UrlPrefix) -> Self {
        Self { prefix }
    }
}

impl UrlMapper for PrefixMapper {
    fn map_url(&self, _tag: &str, url: &str) -> anyhow::Result<Option<String>> {
        Ok(url
            .strip_prefix(&self.prefix.from)
            .map(|rest| format!("{}{}", self.prefix.to, rest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images() -> HashMap<String, Vec<u8>> {
        let mut images = HashMap::new();
        images.insert("images/plot.png".to_string(), b"png".to_vec());
        images.insert("images/blob".to_string(), b"???".to_vec());
        images
    }

    #[test]
    fn test_embed_known_image() {
        let images = images();
        let embedder = ImageEmbedder::new(&images);
        assert_eq!(
            embedder.embed("img", "images/plot.png"),
            Some("data:image/png;base64,cG5n".to_string())
        );
    }

    #[test]
    fn test_embed_percent_encoded_name() {
        let mut images = images();
        images.insert("images/\u{56fe}.png".to_string(), b"png".to_vec());
        images.insert("images/my plot.png".to_string(), b"png".to_vec());
        let embedder = ImageEmbedder::new(&images);
        assert_eq!(
            embedder.embed("img", "images/%E5%9B%BE.png"),
            Some("data:image/png;base64,cG5n".to_string())
        );
        assert_eq!(
            embedder.embed("img", "images/my%20plot.png"),
            Some("data:image/png;base64,cG5n".to_string())
        );
        assert_eq!(embedder.embed("img", "images/no%20such.png"), None);
    }

    #[test]
    fn test_embed_skips_unknown_and_untyped() {
        let images = images();
        let embedder = ImageEmbedder::new(&images);
        assert_eq!(embedder.embed("img", "images/missing.png"), None);
        assert_eq!(embedder.embed("img", "images/blob"), None);
        assert_eq!(embedder.embed("a", "images/plot.png"), None);
    }

    #[test]
    fn test_rewrite_only_touches_attribute_value() {
        let images = images();
        let embedder = ImageEmbedder::new(&images);
        let html = r#"<p>x <img alt='p' src='images/plot.png' width=3> <img src="other.png"></p>"#;
        let out = apply_url_remapping(html, &[&embedder]).unwrap();
        assert_eq!(
            out,
            r#"<p>x <img alt='p' src='data:image/png;base64,cG5n' width=3> <img src="other.png"></p>"#
        );
    }

    #[test]
    fn test_first_mapper_wins() {
        let first = |_: &str, url: &str| -> anyhow::Result<Option<String>> {
            Ok(url.starts_with("/a").then(|| "first".to_string()))
        };
        let second =
            |_: &str, _: &str| -> anyhow::Result<Option<String>> { Ok(Some("second".to_string())) };
        let html = r#"<a href="/a">1</a><a href="/b">2</a>"#;
        let out = apply_url_remapping(html, &[&first, &second]).unwrap();
        assert_eq!(out, r#"<a href="first">1</a><a href="second">2</a>"#);
    }

    #[test]
    fn test_no_mappers_is_identity() {
        let html = r#"<img src="a.png"><a href="b">b</a>"#;
        assert_eq!(apply_url_remapping(html, &[]).unwrap(), html);
    }

    #[test]
    fn test_mapper_error_propagates() {
        let failing = |_: &str, _: &str| -> anyhow::Result<Option<String>> {
            Err(anyhow::anyhow!("boom"))
        };
        let err = apply_url_remapping(r#"<a href="x">x</a>"#, &[&failing]).unwrap_err();
        assert!(matches!(err, RenderError::Mapper { ref tag, .. } if tag == "a"));
    }

    #[test]
    fn test_prefix_mapper() {
        let mapper = PrefixMapper::new(UrlPrefix {
            from: "images/".to_string(),
            to: "https://cdn/".to_string(),
        });
        let html = r#"<img src="images/a.png"><a href="/post">p</a>"#;
        assert_eq!(
            apply_url_remapping(html, &[&mapper]).unwrap(),
            r#"<img src="https://cdn/a.png"><a href="/post">p</a>"#
        );
    }
}
