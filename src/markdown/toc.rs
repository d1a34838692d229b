//! Heading ids and the `[TOC]` marker

use pulldown_cmark::{CowStr, Event};
use std::collections::HashSet;

use crate::helpers::escape_text;

/// Marker paragraph replaced by the table of contents
pub const TOC_MARKER: &str = "[TOC]";

/// A heading seen while rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub level: usize,
    pub id: String,
    pub name: String,
}

/// Hands out unique heading ids
#[derive(Debug, Default)]
pub struct HeadingIds {
    used: HashSet<String>,
}

impl HeadingIds {
    /// Claim an explicit id, or derive a unique one from the heading text
    ///
    /// Collisions get `_1`, `_2`, ... appended.
    pub fn assign(&mut self, explicit: Option<&str>, text: &str) -> String {
        let base = match explicit {
            Some(id) => id.to_string(),
            None => {
                let slug = slug::slugify(text);
                if slug.is_empty() {
                    "section".to_string()
                } else {
                    slug
                }
            }
        };

        let mut id = base.clone();
        let mut n = 1;
        while self.used.contains(&id) {
            id = format!("{}_{}", base, n);
            n += 1;
        }
        self.used.insert(id.clone());
        id
    }
}

/// Render nested `<ul>` lists for the given headings
pub fn render_toc(entries: &[TocEntry]) -> String {
    let mut out = String::from("<div class=\"toc\">\n");
    if !entries.is_empty() {
        write_items(entries, &mut out);
    }
    out.push_str("</div>\n");
    out
}

fn write_items(entries: &[TocEntry], out: &mut String) {
    out.push_str("<ul>\n");
    let mut i = 0;
    while i < entries.len() {
        let entry = &entries[i];
        // Children run until the next heading at this level or above
        let end = entries[i + 1..]
            .iter()
            .position(|e| e.level <= entry.level)
            .map_or(entries.len(), |p| i + 1 + p);

        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            entry.id,
            escape_text(&entry.name)
        ));
        if end > i + 1 {
            out.push('\n');
            write_items(&entries[i + 1..end], out);
        }
        out.push_str("</li>\n");
        i = end;
    }
    out.push_str("</ul>\n");
}

/// Replace `[TOC]` paragraphs with the rendered table of contents
pub fn insert_toc<'a>(events: Vec<Event<'a>>, entries: &[TocEntry]) -> Vec<Event<'a>> {
    use pulldown_cmark::{Tag, TagEnd};

    let is_marker = |window: &[Event<'_>]| {
        matches!(
            window,
            [Event::Start(Tag::Paragraph), Event::Text(t), Event::End(TagEnd::Paragraph)]
                if t.trim() == TOC_MARKER
        )
    };

    if !events.windows(3).any(is_marker) {
        return events;
    }

    let toc = render_toc(entries);
    let mut out = Vec::with_capacity(events.len());
    let mut i = 0;
    while i < events.len() {
        if i + 3 <= events.len() && is_marker(&events[i..i + 3]) {
            out.push(Event::Html(CowStr::from(toc.clone())));
            i += 3;
        } else {
            out.push(events[i].clone());
            i += 1;
        }
    }
    out
}
