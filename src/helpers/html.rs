//! HTML helper functions

/// Escape HTML special characters, quotes included
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape text content the way an XML serializer does (`&`, `<`, `>` only)
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Whether a block of text looks like raw HTML markup
///
/// Notebook exports emit rich outputs as HTML fragments; plain text outputs
/// never contain these tokens.
pub fn looks_like_html(s: &str) -> bool {
    s.contains("<div ") || s.contains("</") || s.contains("<span ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_escape_text_keeps_quotes() {
        assert_eq!(escape_text(r#"a < "b" & c"#), r#"a &lt; "b" &amp; c"#);
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("<div class=\"x\">y"));
        assert!(looks_like_html("<b>bold</b>"));
        assert!(looks_like_html("<span style=\"\">"));
        assert!(!looks_like_html("x < y and y > z"));
        assert!(!looks_like_html("<div>"));
    }
}
