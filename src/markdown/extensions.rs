//! Markdown extensions and the order they run in
//!
//! Every extension hooks into at most three points of the pipeline: line
//! preprocessing, inline patterns over raw source text, and code block
//! processing. The hook order is fixed by the constants below rather than by
//! registration order.

use indexmap::IndexMap;
use pulldown_cmark::{CodeBlockKind, Options};

use super::blocks::{CellOutput, CodeHilite, Highlighter};
use super::inline::{AbbrPattern, MathPattern, Stash, WikiLinkPattern};
use super::preprocess::{
    AbbrDefinitions, Admonitions, AttrListHeadings, FrontMatterStripper, MetaData,
};

/// A markdown extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// Bundle of abbreviations, attribute lists, definition lists, fenced
    /// code, footnotes and tables
    Extra,
    Abbr,
    AttrList,
    DefList,
    FencedCode,
    Footnotes,
    Tables,
    /// No intra-word `__strong__`; CommonMark already behaves this way
    SmartStrong,
    Admonition,
    /// Syntax highlighting, without language guessing
    CodeHilite,
    HeaderId,
    Meta,
    /// Ordered and unordered items never mix; CommonMark already behaves this way
    SaneLists,
    /// Smart quotes, dashes and ellipses
    Smarty,
    /// `[TOC]` marker replacement, heading base level 1
    Toc,
    WikiLinks,
    /// Drops a `---` delimited front-matter block without parsing it
    FrontMatter,
    /// `$...$` and `$$...$$` passthrough for client-side rendering
    Math,
    /// Indented blocks render as program output instead of code
    CellOutput,
}

/// Extensions used to render a post body, in declaration order.
pub const EXTENSIONS: &[Extension] = &[
    Extension::Extra,
    Extension::Abbr,
    Extension::AttrList,
    Extension::DefList,
    Extension::FencedCode,
    Extension::Footnotes,
    Extension::Tables,
    Extension::SmartStrong,
    Extension::Admonition,
    Extension::CodeHilite,
    Extension::HeaderId,
    Extension::Meta,
    Extension::SaneLists,
    Extension::Smarty,
    Extension::Toc,
    Extension::WikiLinks,
    Extension::FrontMatter,
    Extension::Math,
    Extension::CellOutput,
];

/// Line preprocessors in execution order.
///
/// The front-matter stripper must run before meta parsing, otherwise the
/// YAML header would be read as meta lines.
pub const PREPROCESS_ORDER: &[Extension] = &[
    Extension::FrontMatter,
    Extension::Meta,
    Extension::AttrList,
    Extension::Admonition,
    Extension::Abbr,
];

/// Inline patterns in execution order.
///
/// Patterns run on raw source before the parser sees it, so math is matched
/// ahead of backslash escape handling and LaTeX keeps its backslashes. Math
/// goes first so the other patterns never look inside an expression.
pub const INLINE_ORDER: &[Extension] = &[Extension::Math, Extension::WikiLinks, Extension::Abbr];

/// Code block processors, highest precedence first.
///
/// Cell output takes indented blocks before highlighting sees them.
pub const BLOCK_ORDER: &[Extension] = &[Extension::CellOutput, Extension::CodeHilite];

/// Per-document state shared by the pipeline stages
#[derive(Debug, Default)]
pub struct DocumentState {
    /// `key: value` lines collected by the meta extension (keys lowercased)
    pub meta: IndexMap<String, Vec<String>>,
    /// Abbreviation definitions, `ABBR -> title`
    pub abbreviations: IndexMap<String, String>,
    /// HTML fragments hidden from the parser
    pub stash: Stash,
}

/// Rewrites source lines before parsing
pub trait Preprocessor {
    fn run(&self, lines: Vec<String>, doc: &mut DocumentState) -> Vec<String>;
}

/// Matches spans of raw source text outside code and stashes their HTML
pub trait InlinePattern {
    fn apply(&self, text: &str, stash: &mut Stash) -> String;
}

/// Renders a code block produced by the parser
pub trait BlockProcessor: Send + Sync {
    /// Whether this processor claims the block
    fn test(&self, kind: &CodeBlockKind<'_>) -> bool;

    /// Render the block's text to HTML
    fn run(&self, kind: &CodeBlockKind<'_>, code: &str) -> String;
}

impl Extension {
    /// Name as used on the command line and in logs
    pub fn name(self) -> &'static str {
        match self {
            Extension::Extra => "extra",
            Extension::Abbr => "abbr",
            Extension::AttrList => "attr_list",
            Extension::DefList => "def_list",
            Extension::FencedCode => "fenced_code",
            Extension::Footnotes => "footnotes",
            Extension::Tables => "tables",
            Extension::SmartStrong => "smart_strong",
            Extension::Admonition => "admonition",
            Extension::CodeHilite => "codehilite",
            Extension::HeaderId => "headerid",
            Extension::Meta => "meta",
            Extension::SaneLists => "sane_lists",
            Extension::Smarty => "smarty",
            Extension::Toc => "toc",
            Extension::WikiLinks => "wikilinks",
            Extension::FrontMatter => "front_matter",
            Extension::Math => "math",
            Extension::CellOutput => "cell_output",
        }
    }

    /// Parser options this extension turns on
    pub fn options(self) -> Options {
        match self {
            Extension::Extra => {
                Options::ENABLE_TABLES
                    | Options::ENABLE_FOOTNOTES
                    | Options::ENABLE_DEFINITION_LIST
                    | Options::ENABLE_HEADING_ATTRIBUTES
            }
            Extension::AttrList => Options::ENABLE_HEADING_ATTRIBUTES,
            Extension::DefList => Options::ENABLE_DEFINITION_LIST,
            Extension::Footnotes => Options::ENABLE_FOOTNOTES,
            Extension::Tables => Options::ENABLE_TABLES,
            Extension::Smarty => Options::ENABLE_SMART_PUNCTUATION,
            _ => Options::empty(),
        }
    }

    /// Extensions implied by this one
    pub fn implies(self) -> &'static [Extension] {
        match self {
            Extension::Extra => &[
                Extension::Abbr,
                Extension::AttrList,
                Extension::DefList,
                Extension::FencedCode,
                Extension::Footnotes,
                Extension::Tables,
                Extension::SmartStrong,
            ],
            _ => &[],
        }
    }

    pub(crate) fn preprocessor(self) -> Option<Box<dyn Preprocessor>> {
        match self {
            Extension::FrontMatter => Some(Box::new(FrontMatterStripper)),
            Extension::Meta => Some(Box::new(MetaData)),
            Extension::AttrList => Some(Box::new(AttrListHeadings)),
            Extension::Admonition => Some(Box::new(Admonitions)),
            Extension::Abbr => Some(Box::new(AbbrDefinitions)),
            _ => None,
        }
    }

    pub(crate) fn inline_pattern(self, doc: &DocumentState) -> Option<Box<dyn InlinePattern>> {
        match self {
            Extension::Math => Some(Box::new(MathPattern)),
            Extension::WikiLinks => Some(Box::new(WikiLinkPattern)),
            Extension::Abbr => {
                AbbrPattern::new(&doc.abbreviations).map(|p| Box::new(p) as Box<dyn InlinePattern>)
            }
            _ => None,
        }
    }

    pub(crate) fn block_processor(
        self,
        highlighter: &Highlighter,
    ) -> Option<Box<dyn BlockProcessor>> {
        match self {
            Extension::CellOutput => Some(Box::new(CellOutput)),
            Extension::CodeHilite => Some(Box::new(CodeHilite::new(highlighter.clone()))),
            _ => None,
        }
    }
}

impl std::fmt::Display for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(ext: Extension) -> usize {
        EXTENSIONS.iter().position(|e| *e == ext).unwrap()
    }

    #[test]
    fn test_custom_extensions_come_last_in_order() {
        let n = EXTENSIONS.len();
        assert_eq!(position(Extension::FrontMatter), n - 3);
        assert_eq!(position(Extension::Math), n - 2);
        assert_eq!(position(Extension::CellOutput), n - 1);
    }

    #[test]
    fn test_front_matter_runs_before_meta() {
        let fm = PREPROCESS_ORDER
            .iter()
            .position(|e| *e == Extension::FrontMatter)
            .unwrap();
        let meta = PREPROCESS_ORDER
            .iter()
            .position(|e| *e == Extension::Meta)
            .unwrap();
        assert!(fm < meta);
    }

    #[test]
    fn test_math_is_first_inline_pattern() {
        assert_eq!(INLINE_ORDER[0], Extension::Math);
    }

    #[test]
    fn test_extra_implies_tables() {
        assert!(Extension::Extra.implies().contains(&Extension::Tables));
        assert!(Extension::Extra.options().contains(Options::ENABLE_TABLES));
    }
}
