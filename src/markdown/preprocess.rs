//! Line preprocessors

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::VecDeque;

use super::extensions::{DocumentState, Preprocessor};
use super::source::FenceTracker;
use crate::helpers::{escape_text, html_escape};

lazy_static! {
    static ref META_RE: Regex = Regex::new(r"^[ ]{0,3}(?P<key>[A-Za-z0-9_-]+):\s*(?P<value>.*)").unwrap();
    static ref META_MORE_RE: Regex = Regex::new(r"^[ ]{4,}(?P<value>.*)").unwrap();
    static ref META_BEGIN_RE: Regex = Regex::new(r"^-{3}(\s.*)?$").unwrap();
    static ref META_END_RE: Regex = Regex::new(r"^(-{3}|\.{3})(\s.*)?$").unwrap();
    static ref ABBR_DEF_RE: Regex = Regex::new(r"^[*]\[(?P<abbr>[^\]]*)\][ ]?:\s*(?P<title>.*)$").unwrap();
    static ref ATTR_HEADING_RE: Regex = Regex::new(r"^(?P<heading>#{1,6}\s.*?)\s*\{:\s*(?P<attrs>[^}]*?)\s*\}\s*$").unwrap();
    static ref ADMONITION_RE: Regex = Regex::new(r#"^!!! ?(?P<klass>[\w\-]+(?: +[\w\-]+)*)(?: +"(?P<title>.*?)")? *$"#).unwrap();
}

/// Drops everything up to and including the second `---` line
///
/// The block is removed without being parsed. Text with fewer than two
/// delimiter lines passes through unchanged.
pub struct FrontMatterStripper;

impl Preprocessor for FrontMatterStripper {
    fn run(&self, lines: Vec<String>, _doc: &mut DocumentState) -> Vec<String> {
        let closing = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.trim() == "---")
            .nth(1)
            .map(|(i, _)| i);

        match closing {
            Some(i) => {
                tracing::debug!("Stripped {} front-matter lines", i + 1);
                lines.into_iter().skip(i + 1).collect()
            }
            None => lines,
        }
    }
}

/// Consumes leading `key: value` lines into document metadata
///
/// Continuation lines indented by four spaces append to the previous key.
/// The block ends at the first blank line or `---`/`...` line, which is
/// consumed too.
pub struct MetaData;

impl Preprocessor for MetaData {
    fn run(&self, lines: Vec<String>, doc: &mut DocumentState) -> Vec<String> {
        let mut lines: VecDeque<String> = lines.into();
        let mut key: Option<String> = None;

        if lines.front().is_some_and(|l| META_BEGIN_RE.is_match(l)) {
            lines.pop_front();
        }

        while let Some(line) = lines.pop_front() {
            if line.trim().is_empty() || META_END_RE.is_match(&line) {
                break;
            }
            if let Some(caps) = META_RE.captures(&line) {
                let k = caps["key"].trim().to_lowercase();
                doc.meta
                    .entry(k.clone())
                    .or_default()
                    .push(caps["value"].trim().to_string());
                key = Some(k);
                continue;
            }
            match (META_MORE_RE.captures(&line), key.as_ref()) {
                (Some(caps), Some(k)) => {
                    let value = caps["value"].trim().to_string();
                    doc.meta.entry(k.clone()).or_default().push(value);
                }
                _ => {
                    lines.push_front(line);
                    break;
                }
            }
        }

        lines.into()
    }
}

/// Collects `*[ABBR]: Title` definitions and removes their lines
pub struct AbbrDefinitions;

impl Preprocessor for AbbrDefinitions {
    fn run(&self, lines: Vec<String>, doc: &mut DocumentState) -> Vec<String> {
        let mut fences = FenceTracker::default();
        let mut out = Vec::with_capacity(lines.len());

        for line in lines {
            if !fences.is_code(&line) {
                if let Some(caps) = ABBR_DEF_RE.captures(&line) {
                    doc.abbreviations.insert(
                        caps["abbr"].trim().to_string(),
                        caps["title"].trim().to_string(),
                    );
                    continue;
                }
            }
            out.push(line);
        }

        out
    }
}

/// Rewrites `# Heading {: #id .class}` to the parser's `{#id .class}` form
pub struct AttrListHeadings;

impl Preprocessor for AttrListHeadings {
    fn run(&self, lines: Vec<String>, _doc: &mut DocumentState) -> Vec<String> {
        let mut fences = FenceTracker::default();
        lines
            .into_iter()
            .map(|line| {
                if fences.is_code(&line) {
                    return line;
                }
                match ATTR_HEADING_RE.captures(&line) {
                    Some(caps) => format!("{} {{{}}}", &caps["heading"], &caps["attrs"]),
                    None => line,
                }
            })
            .collect()
    }
}

/// Turns `!!! type "Title"` blocks into admonition divs
///
/// The indented body is dedented and left as markdown between the opening
/// and closing div lines, separated by blank lines so the parser treats the
/// body as markdown rather than raw HTML.
pub struct Admonitions;

impl Admonitions {
    fn open_tag(klass: &str, title: Option<&str>) -> Vec<String> {
        let title = match title {
            Some(t) => t.to_string(),
            None => capitalize(klass.split(' ').next().unwrap_or_default()),
        };
        let mut out = vec![format!(r#"<div class="admonition {}">"#, html_escape(klass))];
        if !title.is_empty() {
            out.push(format!(
                r#"<p class="admonition-title">{}</p>"#,
                escape_text(&title)
            ));
        }
        out.push(String::new());
        out
    }
}

impl Preprocessor for Admonitions {
    fn run(&self, lines: Vec<String>, doc: &mut DocumentState) -> Vec<String> {
        let mut fences = FenceTracker::default();
        let mut out = Vec::with_capacity(lines.len());
        let mut iter = lines.into_iter().peekable();

        while let Some(line) = iter.next() {
            if fences.is_code(&line) {
                out.push(line);
                continue;
            }
            let Some(caps) = ADMONITION_RE.captures(&line) else {
                out.push(line);
                continue;
            };

            let mut body = Vec::new();
            let mut pending_blank = 0;
            while let Some(next) = iter.peek() {
                if next.trim().is_empty() {
                    pending_blank += 1;
                } else if let Some(dedented) = dedent(next) {
                    body.extend(std::iter::repeat(String::new()).take(pending_blank));
                    pending_blank = 0;
                    body.push(dedented.to_string());
                } else {
                    break;
                }
                iter.next();
            }

            out.extend(Self::open_tag(
                &caps["klass"],
                caps.name("title").map(|m| m.as_str()),
            ));
            out.extend(self.run(body, doc));
            out.push(String::new());
            out.push("</div>".to_string());
            out.extend(std::iter::repeat(String::new()).take(pending_blank.max(1)));
        }

        out
    }
}

/// Strip one level of indentation (four spaces or a tab)
fn dedent(line: &str) -> Option<&str> {
    line.strip_prefix("    ").or_else(|| line.strip_prefix('\t'))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_strip_front_matter() {
        let mut doc = DocumentState::default();
        let out = FrontMatterStripper.run(lines(&["---", "title: A", "---", "body"]), &mut doc);
        assert_eq!(out, lines(&["body"]));
    }

    #[test]
    fn test_strip_front_matter_stops_at_second_delimiter() {
        let mut doc = DocumentState::default();
        let out = FrontMatterStripper.run(
            lines(&["---", "a: 1", " --- ", "text", "---", "more"]),
            &mut doc,
        );
        assert_eq!(out, lines(&["text", "---", "more"]));
    }

    #[test]
    fn test_no_front_matter_passes_through() {
        let mut doc = DocumentState::default();
        let input = lines(&["# Title", "", "---", "after a rule"]);
        assert_eq!(FrontMatterStripper.run(input.clone(), &mut doc), input);
    }

    #[test]
    fn test_meta_lines_are_consumed() {
        let mut doc = DocumentState::default();
        let out = MetaData.run(
            lines(&["Title: Notes", "Authors: a", "    b", "", "Body text"]),
            &mut doc,
        );
        assert_eq!(out, lines(&["Body text"]));
        assert_eq!(doc.meta["title"], vec!["Notes"]);
        assert_eq!(doc.meta["authors"], vec!["a", "b"]);
    }

    #[test]
    fn test_meta_leaves_plain_text() {
        let mut doc = DocumentState::default();
        let out = MetaData.run(lines(&["body", "more"]), &mut doc);
        assert_eq!(out, lines(&["body", "more"]));
        assert!(doc.meta.is_empty());
    }

    #[test]
    fn test_abbr_definitions() {
        let mut doc = DocumentState::default();
        let out = AbbrDefinitions.run(
            lines(&["The HTML spec.", "", "*[HTML]: Hyper Text Markup Language"]),
            &mut doc,
        );
        assert_eq!(out, lines(&["The HTML spec.", ""]));
        assert_eq!(doc.abbreviations["HTML"], "Hyper Text Markup Language");
    }

    #[test]
    fn test_attr_list_heading() {
        let mut doc = DocumentState::default();
        let out = AttrListHeadings.run(lines(&["## Results {: #res .wide }"]), &mut doc);
        assert_eq!(out, lines(&["## Results {#res .wide}"]));
    }

    #[test]
    fn test_admonition() {
        let mut doc = DocumentState::default();
        let out = Admonitions.run(
            lines(&["!!! warning", "    Be *careful*.", "", "    Really.", "", "after"]),
            &mut doc,
        );
        assert_eq!(
            out,
            lines(&[
                r#"<div class="admonition warning">"#,
                r#"<p class="admonition-title">Warning</p>"#,
                "",
                "Be *careful*.",
                "",
                "Really.",
                "",
                "</div>",
                "",
                "after",
            ])
        );
    }

    #[test]
    fn test_admonition_with_empty_title() {
        let mut doc = DocumentState::default();
        let out = Admonitions.run(lines(&[r#"!!! note """#, "    body"]), &mut doc);
        assert_eq!(out[0], r#"<div class="admonition note">"#);
        assert_eq!(out[1], "");
        assert_eq!(out[2], "body");
    }
}
