//! Inline patterns matched on raw source text
//!
//! Matches are swapped for placeholders before parsing and swapped back
//! once the HTML is written, so the parser never rewrites their content.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::extensions::InlinePattern;
use super::source::{split_code_spans, FenceTracker, Segment};
use crate::helpers::{escape_text, html_escape};

lazy_static! {
    static ref PLACEHOLDER_RE: Regex = Regex::new("\u{2}stash(\\d+)\u{3}").unwrap();
    static ref WIKILINK_RE: Regex = Regex::new(r"\[\[([\w0-9_ -]+)\]\]").unwrap();
    static ref WIKILINK_LABEL_RE: Regex = Regex::new(r"([ ]+_)|(_[ ]+)|([ ]+)").unwrap();
}

#[derive(Debug, Clone)]
struct Stashed {
    source: String,
    html: String,
}

/// Fragments hidden from the parser behind placeholders
#[derive(Debug, Default)]
pub struct Stash {
    entries: Vec<Stashed>,
}

impl Stash {
    /// Store a fragment; returns the placeholder to put in the source
    pub fn store(&mut self, source: &str, html: String) -> String {
        self.entries.push(Stashed {
            source: source.to_string(),
            html,
        });
        format!("\u{2}stash{}\u{3}", self.entries.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace placeholders with their HTML
    pub fn restore_html(&self, text: &str) -> String {
        self.restore(text, true)
    }

    /// Replace placeholders with the source text they hid
    ///
    /// Used where the parser put a placeholder into code.
    pub fn restore_source(&self, text: &str) -> String {
        self.restore(text, false)
    }

    fn restore(&self, text: &str, html: bool) -> String {
        if self.entries.is_empty() || !text.contains('\u{2}') {
            return text.to_string();
        }
        PLACEHOLDER_RE
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.entries.get(i))
                    .map(|entry| if html { entry.html.clone() } else { entry.source.clone() })
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Run inline patterns over the source outside code
///
/// Consecutive paragraph lines are matched as one text, so a span may wrap
/// onto the next line but never crosses a blank line, a fence or a heading.
pub fn apply_patterns(
    lines: &[String],
    patterns: &[Box<dyn InlinePattern>],
    stash: &mut Stash,
) -> String {
    let mut out = String::new();
    if patterns.is_empty() {
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        return out;
    }

    let mut fences = FenceTracker::default();
    let mut paragraph: Vec<&str> = Vec::new();

    for line in lines {
        if fences.is_code(line) || line.trim().is_empty() {
            flush_paragraph(&mut paragraph, patterns, stash, &mut out);
            out.push_str(line);
            out.push('\n');
        } else if is_atx_heading(line) || (paragraph.is_empty() && is_indented_code(line)) {
            flush_paragraph(&mut paragraph, patterns, stash, &mut out);
            out.push_str(&apply_to_text(line, patterns, stash));
            out.push('\n');
        } else {
            paragraph.push(line);
        }
    }
    flush_paragraph(&mut paragraph, patterns, stash, &mut out);

    out
}

fn flush_paragraph(
    paragraph: &mut Vec<&str>,
    patterns: &[Box<dyn InlinePattern>],
    stash: &mut Stash,
    out: &mut String,
) {
    if paragraph.is_empty() {
        return;
    }
    out.push_str(&apply_to_text(&paragraph.join("\n"), patterns, stash));
    out.push('\n');
    paragraph.clear();
}

/// Apply every pattern to the parts of `text` outside code spans
fn apply_to_text(text: &str, patterns: &[Box<dyn InlinePattern>], stash: &mut Stash) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in split_code_spans(text) {
        match segment {
            Segment::Code(code) => out.push_str(code),
            Segment::Text(text) => {
                let mut text = text.to_string();
                for pattern in patterns {
                    text = pattern.apply(&text, stash);
                }
                out.push_str(&text);
            }
        }
    }
    out
}

fn is_atx_heading(line: &str) -> bool {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return false;
    }
    let rest = line[indent..].trim_start_matches('#');
    let hashes = line.len() - indent - rest.len();
    (1..=6).contains(&hashes) && (rest.is_empty() || rest.starts_with([' ', '\t']))
}

/// Indented code, when the line does not continue a paragraph
fn is_indented_code(line: &str) -> bool {
    line.starts_with('\t') || line.starts_with("    ")
}

/// `$...$` and `$$...$$` spans, kept verbatim for a client-side renderer
///
/// An unescaped `$` or `$$` opens a span which closes at the nearest
/// matching delimiter after at least one character. The text handed in is a
/// whole paragraph, so spans may run over line breaks.
pub struct MathPattern;

impl MathPattern {
    /// Find the next math span at or after `from`, as a byte range
    fn find(text: &str, from: usize) -> Option<(usize, usize)> {
        let bytes = text.as_bytes();
        let mut i = from;
        while i < bytes.len() {
            if bytes[i] == b'$' && (i == 0 || bytes[i - 1] != b'\\') {
                let delimiters: &[&str] = if bytes.get(i + 1) == Some(&b'$') {
                    &["$$", "$"]
                } else {
                    &["$"]
                };
                for delim in delimiters {
                    if let Some(end) = Self::close(text, i + delim.len(), delim) {
                        return Some((i, end));
                    }
                }
            }
            i += 1;
        }
        None
    }

    /// End of the span whose content starts at `start`, if it closes
    fn close(text: &str, start: usize, delim: &str) -> Option<usize> {
        let first = text[start..].chars().next()?;
        let search_from = start + first.len_utf8();
        text[search_from..]
            .find(delim)
            .map(|pos| search_from + pos + delim.len())
    }
}

impl InlinePattern for MathPattern {
    fn apply(&self, text: &str, stash: &mut Stash) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        while let Some((start, end)) = Self::find(text, last) {
            out.push_str(&text[last..start]);
            let math = &text[start..end];
            let html = format!("<mathjax>{}</mathjax>", escape_text(math));
            out.push_str(&stash.store(math, html));
            last = end;
        }
        out.push_str(&text[last..]);
        out
    }
}

/// `[[Page Name]]` links to `/Page_Name/`
pub struct WikiLinkPattern;

impl InlinePattern for WikiLinkPattern {
    fn apply(&self, text: &str, stash: &mut Stash) -> String {
        WIKILINK_RE
            .replace_all(text, |caps: &Captures| {
                let label = caps[1].trim();
                if label.is_empty() {
                    return caps[0].to_string();
                }
                let target = WIKILINK_LABEL_RE.replace_all(label, "_");
                let html = format!(
                    r#"<a class="wikilink" href="/{}/">{}</a>"#,
                    html_escape(&target),
                    escape_text(label)
                );
                stash.store(&caps[0], html)
            })
            .into_owned()
    }
}

/// Wraps defined abbreviations in `<abbr>` elements
pub struct AbbrPattern {
    regex: Regex,
    titles: IndexMap<String, String>,
}

impl AbbrPattern {
    /// Build a matcher for the given definitions; `None` when there are none
    pub fn new(abbreviations: &IndexMap<String, String>) -> Option<Self> {
        if abbreviations.is_empty() {
            return None;
        }
        let mut keys: Vec<&String> = abbreviations.keys().collect();
        // Longest first so "HTML5" wins over "HTML"
        keys.sort_by_key(|k| std::cmp::Reverse(k.len()));
        let alternation = keys
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&format!(r"\b(?:{})\b", alternation)).ok()?;
        Some(Self {
            regex,
            titles: abbreviations.clone(),
        })
    }
}

impl InlinePattern for AbbrPattern {
    fn apply(&self, text: &str, stash: &mut Stash) -> String {
        self.regex
            .replace_all(text, |caps: &Captures| {
                let abbr = &caps[0];
                let title = self.titles.get(abbr).map(String::as_str).unwrap_or("");
                let html = format!(
                    r#"<abbr title="{}">{}</abbr>"#,
                    html_escape(title),
                    escape_text(abbr)
                );
                stash.store(abbr, html)
            })
            .into_owned()
    }
}
