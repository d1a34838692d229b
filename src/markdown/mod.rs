//! Markdown rendering on top of pulldown-cmark
//!
//! The engine runs a post body through four stages: line preprocessors,
//! inline patterns over raw source, the pulldown-cmark parser with an event
//! pass for headings and code blocks, and finally HTML serialization with
//! stashed fragments restored.

mod blocks;
mod extensions;
mod inline;
mod preprocess;
mod source;
mod toc;

pub use blocks::{Highlighter, DEFAULT_THEME};
pub use extensions::{
    BlockProcessor, DocumentState, Extension, InlinePattern, Preprocessor, BLOCK_ORDER,
    EXTENSIONS, INLINE_ORDER, PREPROCESS_ORDER,
};
pub use inline::Stash;
pub use toc::TocEntry;

use indexmap::IndexMap;
use pulldown_cmark::utils::TextMergeStream;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashSet;

use toc::HeadingIds;

/// Result of converting one markdown document
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub html: String,
    /// Metadata read by the meta extension
    pub meta: IndexMap<String, Vec<String>>,
    /// Headings in document order
    pub toc: Vec<TocEntry>,
}

/// Markdown to HTML converter with a fixed extension set
pub struct MarkdownEngine {
    extensions: Vec<Extension>,
    enabled: HashSet<Extension>,
    highlighter: Highlighter,
    blocks: Vec<Box<dyn BlockProcessor>>,
}

impl MarkdownEngine {
    /// Create an engine with the default highlighter
    pub fn new(extensions: &[Extension]) -> Self {
        Self::with_highlighter(extensions, Highlighter::new())
    }

    /// Create an engine sharing an existing highlighter
    pub fn with_highlighter(extensions: &[Extension], highlighter: Highlighter) -> Self {
        let mut enabled = HashSet::new();
        for ext in extensions {
            enabled.insert(*ext);
            enabled.extend(ext.implies().iter().copied());
        }

        let blocks = BLOCK_ORDER
            .iter()
            .filter(|ext| enabled.contains(*ext))
            .filter_map(|ext| ext.block_processor(&highlighter))
            .collect();

        Self {
            extensions: extensions.to_vec(),
            enabled,
            highlighter,
            blocks,
        }
    }

    /// A copy of this engine with one extension removed
    pub fn without(&self, removed: Extension) -> Self {
        let extensions: Vec<Extension> = self
            .extensions
            .iter()
            .copied()
            .filter(|ext| *ext != removed)
            .collect();
        Self::with_highlighter(&extensions, self.highlighter.clone())
    }

    /// Extensions in declaration order
    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub fn is_enabled(&self, ext: Extension) -> bool {
        self.enabled.contains(&ext)
    }

    fn options(&self) -> Options {
        self.enabled
            .iter()
            .fold(Options::empty(), |opts, ext| opts | ext.options())
    }

    /// Render markdown to HTML
    pub fn convert(&self, markdown: &str) -> String {
        self.convert_document(markdown).html
    }

    /// Render markdown, keeping the metadata and headings found on the way
    pub fn convert_document(&self, markdown: &str) -> Document {
        let mut doc = DocumentState::default();

        let mut lines: Vec<String> = markdown.lines().map(str::to_string).collect();
        for ext in PREPROCESS_ORDER.iter().filter(|e| self.is_enabled(**e)) {
            if let Some(pre) = ext.preprocessor() {
                lines = pre.run(lines, &mut doc);
            }
        }

        let patterns: Vec<Box<dyn InlinePattern>> = INLINE_ORDER
            .iter()
            .filter(|e| self.is_enabled(**e))
            .filter_map(|e| e.inline_pattern(&doc))
            .collect();
        let source = inline::apply_patterns(&lines, &patterns, &mut doc.stash);

        let parser = Parser::new_ext(&source, self.options());
        let events: Vec<Event> = TextMergeStream::new(parser).collect();
        let (events, toc) = self.process_events(events, &doc.stash);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        let html_output = doc.stash.restore_html(&html_output);

        tracing::debug!(
            "Converted {} bytes of markdown ({} stashed fragments, {} headings)",
            markdown.len(),
            doc.stash.len(),
            toc.len()
        );

        Document {
            html: html_output.trim().to_string(),
            meta: doc.meta,
            toc,
        }
    }

    /// Assign heading ids, run block processors and place the TOC
    fn process_events<'a>(
        &self,
        events: Vec<Event<'a>>,
        stash: &Stash,
    ) -> (Vec<Event<'a>>, Vec<TocEntry>) {
        let heading_ids = self.is_enabled(Extension::HeaderId) || self.is_enabled(Extension::Toc);
        let mut ids = HeadingIds::default();
        let mut toc = Vec::new();
        let mut out = Vec::with_capacity(events.len());
        let mut images = 0;
        let mut iter = events.into_iter();

        while let Some(event) = iter.next() {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let mut code = String::new();
                    for inner in iter.by_ref() {
                        match inner {
                            Event::End(TagEnd::CodeBlock) => break,
                            Event::Text(text) => code.push_str(&text),
                            _ => {}
                        }
                    }
                    let code = stash.restore_source(&code);
                    match self.blocks.iter().find(|p| p.test(&kind)) {
                        Some(processor) => {
                            out.push(Event::Html(CowStr::from(processor.run(&kind, &code))))
                        }
                        None => {
                            out.push(Event::Start(Tag::CodeBlock(kind)));
                            out.push(Event::Text(CowStr::from(code)));
                            out.push(Event::End(TagEnd::CodeBlock));
                        }
                    }
                }
                Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }) if heading_ids => {
                    let mut inner = Vec::new();
                    let mut text = String::new();
                    for ev in iter.by_ref() {
                        if matches!(ev, Event::End(TagEnd::Heading(_))) {
                            inner.push(ev);
                            break;
                        }
                        if let Event::Text(t) | Event::Code(t) = &ev {
                            text.push_str(t);
                        }
                        inner.push(restore_source(ev, stash, &mut images));
                    }
                    let text = stash.restore_source(&text);
                    let id = ids.assign(id.as_deref(), &text);
                    toc.push(TocEntry {
                        level: level as usize,
                        id: id.clone(),
                        name: text.trim().to_string(),
                    });
                    out.push(Event::Start(Tag::Heading {
                        level,
                        id: Some(CowStr::from(id)),
                        classes,
                        attrs,
                    }));
                    out.extend(inner);
                }
                other => out.push(restore_source(other, stash, &mut images)),
            }
        }

        let out = if self.is_enabled(Extension::Toc) {
            toc::insert_toc(out, &toc)
        } else {
            out
        };
        (out, toc)
    }
}

/// Put back the source text of placeholders that end up in code or in an
/// attribute
///
/// `images` counts the open image tags, whose text becomes the `alt`
/// attribute.
fn restore_source<'a>(event: Event<'a>, stash: &Stash, images: &mut usize) -> Event<'a> {
    match event {
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => {
            *images += 1;
            Event::Start(Tag::Image {
                link_type,
                dest_url: restore_attr(dest_url, stash),
                title: restore_attr(title, stash),
                id,
            })
        }
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: restore_attr(dest_url, stash),
            title: restore_attr(title, stash),
            id,
        }),
        Event::End(TagEnd::Image) => {
            *images = images.saturating_sub(1);
            Event::End(TagEnd::Image)
        }
        Event::Text(text) if *images > 0 => Event::Text(restore_attr(text, stash)),
        Event::Code(code) => Event::Code(restore_attr(code, stash)),
        other => other,
    }
}

fn restore_attr<'a>(value: CowStr<'a>, stash: &Stash) -> CowStr<'a> {
    if value.contains('\u{2}') {
        CowStr::from(stash.restore_source(&value))
    } else {
        value
    }
}

impl Default for MarkdownEngine {
    fn default() -> Self {
        Self::new(EXTENSIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MarkdownEngine {
        MarkdownEngine::default()
    }

    #[test]
    fn test_render_basic_markdown() {
        let html = engine().convert("# Hello World\n\nThis is a test.");
        assert!(html.contains(r#"<h1 id="hello-world">Hello World</h1>"#));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_front_matter_is_stripped() {
        let html = engine().convert("---\ntitle: A\nauthors:\n- x\n---\nbody");
        assert_eq!(html, "<p>body</p>");
    }

    #[test]
    fn test_indented_blocks_merge_into_one_output() {
        let html = engine().convert("Intro\n\n    first\n\n    second\n\nDone.");
        assert_eq!(html.matches("code-output").count(), 1);
        assert!(html.contains("<div class=\"code-output pre\">first\n\nsecond\n</div>"));
        assert!(html.ends_with("<p>Done.</p>"));
    }

    #[test]
    fn test_html_output_is_inserted_raw() {
        let html = engine().convert("Result\n\n    <table><tr><td>1</td></tr></table>\n");
        assert!(html.contains(
            "<div class=\"code-output\"><table><tr><td>1</td></tr></table>\n</div>"
        ));
    }

    #[test]
    fn test_unindented_tail_is_processed_normally() {
        let html = engine().convert("Intro\n\n    out\n**bold** again");
        assert!(html.contains("<div class=\"code-output pre\">out\n</div>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_without_cell_output_indented_is_code() {
        let html = engine()
            .without(Extension::CellOutput)
            .convert("Intro\n\n    x = 1\n");
        assert!(!html.contains("code-output"));
        assert!(html.contains("codehilite"));
    }

    #[test]
    fn test_math_keeps_backslashes() {
        let html = engine().convert(r"Area is $\pi r^2$ and $$\sum_i x_i$$.");
        assert!(html.contains(r"<mathjax>$\pi r^2$</mathjax>"));
        assert!(html.contains(r"<mathjax>$$\sum_i x_i$$</mathjax>"));
    }

    #[test]
    fn test_math_emphasis_is_not_parsed() {
        let html = engine().convert("$a_1 * b_2 * c$");
        assert!(html.contains("<mathjax>$a_1 * b_2 * c$</mathjax>"));
        assert!(!html.contains("<em>"));
    }

    #[test]
    fn test_display_math_over_several_lines() {
        let html = engine().convert("Given\n$$\n\\frac{a}{b} \\\\ c_1 *x* c_2\n$$\n\nEnd.");
        assert!(html.contains("<mathjax>$$\n\\frac{a}{b} \\\\ c_1 *x* c_2\n$$</mathjax>"));
        assert!(!html.contains("<em>"));
        assert!(html.ends_with("<p>End.</p>"));
    }

    #[test]
    fn test_inline_math_wrapped_onto_next_line() {
        let html = engine().convert("Inline $a +\nb$ here.");
        assert_eq!(html, "<p>Inline <mathjax>$a +\nb$</mathjax> here.</p>");
    }

    #[test]
    fn test_math_does_not_cross_paragraphs() {
        let html = engine().convert("Costs $5\n\nand $6");
        assert!(!html.contains("mathjax"));
        assert!(html.contains("<p>Costs $5</p>"));
    }

    #[test]
    fn test_math_in_image_alt_keeps_source() {
        let html = engine().convert("![$x<y$](plot.png)");
        assert!(html.contains(r#"alt="$x&lt;y$""#));
        assert!(!html.contains("mathjax"));
        assert!(!html.contains('\u{2}'));
    }

    #[test]
    fn test_math_in_code_is_left_alone() {
        let html = engine().convert("`$x$`\n\n```\n$y$\n```\n\n    $z$\n");
        assert!(!html.contains("mathjax"));
        assert!(html.contains("<code>$x$</code>"));
        assert!(html.contains("$z$"));
    }

    #[test]
    fn test_fenced_code_is_highlighted() {
        let html = engine().convert("```python\nprint('hi')\n```");
        assert!(html.starts_with("<div class=\"codehilite\">"));
        assert!(html.contains("print"));
    }

    #[test]
    fn test_tables_and_footnotes() {
        let html = engine().convert("| a | b |\n|---|---|\n| 1 | 2 |\n\nNote[^1].\n\n[^1]: Footnote.");
        assert!(html.contains("<table>"));
        assert!(html.contains("footnote"));
    }

    #[test]
    fn test_duplicate_headings_get_unique_ids() {
        let html = engine().convert("## Setup\n\n## Setup");
        assert!(html.contains(r#"<h2 id="setup">"#));
        assert!(html.contains(r#"<h2 id="setup_1">"#));
    }

    #[test]
    fn test_attr_list_heading_id() {
        let html = engine().convert("## Results {: #res }");
        assert!(html.contains(r#"<h2 id="res">Results</h2>"#));
    }

    #[test]
    fn test_toc_marker() {
        let doc = engine().convert_document("[TOC]\n\n# One\n\n## Two\n");
        assert!(doc.html.starts_with("<div class=\"toc\">"));
        assert!(doc.html.contains(r##"<a href="#two">Two</a>"##));
        assert_eq!(doc.toc.len(), 2);
    }

    #[test]
    fn test_meta_after_front_matter() {
        let doc = engine().convert_document("---\nx: 1\n---\nSummary: short\n\nBody");
        assert_eq!(doc.meta["summary"], vec!["short"]);
        assert_eq!(doc.html, "<p>Body</p>");
    }

    #[test]
    fn test_smart_punctuation() {
        let html = engine().convert("\"quoted\" -- dash...");
        assert!(html.contains('\u{201c}'));
        assert!(html.contains('\u{2026}'));
    }

    #[test]
    fn test_admonition_renders_markdown_body() {
        let html = engine().convert("!!! note \"Heads up\"\n    Use *care*.\n");
        assert!(html.contains(r#"<div class="admonition note">"#));
        assert!(html.contains(r#"<p class="admonition-title">Heads up</p>"#));
        assert!(html.contains("<p>Use <em>care</em>.</p>"));
        assert!(!html.contains("code-output"));
    }

    #[test]
    fn test_wikilinks_and_abbreviations() {
        let html = engine().convert("See [[Team Wiki]] about the API.\n\n*[API]: Application Programming Interface");
        assert!(html.contains(r#"<a class="wikilink" href="/Team_Wiki/">Team Wiki</a>"#));
        assert!(html.contains(r#"<abbr title="Application Programming Interface">API</abbr>"#));
    }

    #[test]
    fn test_definition_list() {
        let html = engine().convert("Term\n: Definition");
        assert!(html.contains("<dl>"));
    }
}
