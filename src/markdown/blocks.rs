//! Code block processors: cell output and syntax highlighting

use pulldown_cmark::CodeBlockKind;
use std::sync::Arc;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::extensions::BlockProcessor;
use crate::helpers::{escape_text, looks_like_html};

/// Default syntect theme
pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Renders indented blocks as program output
///
/// Blank lines inside an indented run do not end it, so blocks separated by
/// blank lines end up in a single output element. Output that looks like
/// HTML is inserted as markup; anything else is escaped and tagged `pre`.
pub struct CellOutput;

impl BlockProcessor for CellOutput {
    fn test(&self, kind: &CodeBlockKind<'_>) -> bool {
        matches!(kind, CodeBlockKind::Indented)
    }

    fn run(&self, _kind: &CodeBlockKind<'_>, code: &str) -> String {
        let block = code.trim_end();
        if looks_like_html(block) {
            format!("<div class=\"code-output\">{}\n</div>\n", block)
        } else {
            format!(
                "<div class=\"code-output pre\">{}\n</div>\n",
                escape_text(block)
            )
        }
    }
}

/// Highlights code blocks by their fence language
///
/// The language is never guessed: blocks without a recognised language
/// are highlighted as plain text.
pub struct CodeHilite {
    highlighter: Highlighter,
}

impl CodeHilite {
    pub fn new(highlighter: Highlighter) -> Self {
        Self { highlighter }
    }
}

impl BlockProcessor for CodeHilite {
    fn test(&self, _kind: &CodeBlockKind<'_>) -> bool {
        true
    }

    fn run(&self, kind: &CodeBlockKind<'_>, code: &str) -> String {
        let lang = match kind {
            CodeBlockKind::Fenced(info) => info.split_whitespace().next(),
            CodeBlockKind::Indented => None,
        };
        self.highlighter.highlight(code, lang)
    }
}

/// Syntax highlighter with a preloaded syntax and theme set
#[derive(Clone)]
pub struct Highlighter {
    syntax_set: Arc<SyntaxSet>,
    theme: Arc<Theme>,
    line_numbers: bool,
}

impl Highlighter {
    /// Create a highlighter with the default theme and no line numbers
    pub fn new() -> Self {
        Self::with_options(DEFAULT_THEME, false)
    }

    /// Create with custom settings
    ///
    /// An unknown theme name falls back to the default theme.
    pub fn with_options(theme: &str, line_numbers: bool) -> Self {
        let mut theme_set = ThemeSet::load_defaults();
        let theme = match theme_set.themes.remove(theme) {
            Some(t) => t,
            None => {
                tracing::warn!("Unknown highlight theme {:?}, using {}", theme, DEFAULT_THEME);
                theme_set
                    .themes
                    .remove(DEFAULT_THEME)
                    .unwrap_or_default()
            }
        };
        Self {
            syntax_set: Arc::new(SyntaxSet::load_defaults_newlines()),
            theme: Arc::new(theme),
            line_numbers,
        }
    }

    /// Highlight a code block
    pub fn highlight(&self, code: &str, lang: Option<&str>) -> String {
        let syntax = lang
            .and_then(|lang| {
                self.syntax_set
                    .find_syntax_by_token(lang)
                    .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            })
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let body = match highlighted_html_for_string(code, &self.syntax_set, syntax, &self.theme) {
            Ok(highlighted) if self.line_numbers => add_line_numbers(&highlighted),
            Ok(highlighted) => highlighted,
            Err(e) => {
                tracing::debug!("Highlighting failed, emitting plain block: {}", e);
                format!("<pre><code>{}</code></pre>\n", escape_text(code))
            }
        };

        format!("<div class=\"codehilite\">{}</div>\n", body)
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

/// Put highlighted code next to a line-number gutter
fn add_line_numbers(code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();

    let gutter = (1..=lines.len())
        .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<table class="codehilitetable"><tr><td class="linenos"><pre>{}</pre></td><td class="code">{}</td></tr></table>"#,
        gutter,
        lines.join("\n")
    )
}
