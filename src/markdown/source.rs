//! Line-level scanning of markdown source
//!
//! Preprocessors and inline patterns work on raw lines, so they need to
//! know which parts of the source are code and must be left alone.

/// Tracks whether the current line sits inside a fenced code block
#[derive(Debug, Default)]
pub struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    /// Feed the next line; returns true if it is a fence line or fenced code
    pub fn is_code(&mut self, line: &str) -> bool {
        let fence = fence_marker(line);
        match (self.open, fence) {
            (Some((ch, len)), Some((c, n, rest))) if c == ch && n >= len && rest.trim().is_empty() => {
                self.open = None;
                true
            }
            (Some(_), _) => true,
            (None, Some((c, n, rest))) => {
                // Backtick fences may not carry backticks in their info string
                if c == '`' && rest.contains('`') {
                    return false;
                }
                self.open = Some((c, n));
                true
            }
            (None, None) => false,
        }
    }
}

/// Parse a fence opener/closer: marker char, run length and the remainder
fn fence_marker(line: &str) -> Option<(char, usize, &str)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let trimmed = &line[indent..];
    let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = trimmed.chars().take_while(|c| *c == ch).count();
    if run < 3 {
        return None;
    }
    Some((ch, run, &trimmed[run..]))
}

/// A piece of a source line
#[derive(Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    /// A backtick code span, delimiters included
    Code(&'a str),
}

/// Split a line or paragraph into plain text and backtick code spans
///
/// A span opens with a run of backticks and closes at the next run of the
/// same length. An opener with no closer is plain text.
pub fn split_code_spans(line: &str) -> Vec<Segment<'_>> {
    let bytes = line.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let run = backtick_run(bytes, i);
        match find_closing_run(bytes, i + run, run) {
            Some(close) => {
                if text_start < i {
                    segments.push(Segment::Text(&line[text_start..i]));
                }
                let end = close + run;
                segments.push(Segment::Code(&line[i..end]));
                text_start = end;
                i = end;
            }
            None => i += run,
        }
    }

    if text_start < line.len() {
        segments.push(Segment::Text(&line[text_start..]));
    }
    segments
}

fn backtick_run(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().take_while(|b| **b == b'`').count()
}

fn find_closing_run(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = backtick_run(bytes, i);
            if run == len {
                return Some(i);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_tracking() {
        let mut fences = FenceTracker::default();
        let flags: Vec<bool> = ["text", "```python", "x = 1", "```", "after"]
            .iter()
            .map(|l| fences.is_code(l))
            .collect();
        assert_eq!(flags, vec![false, true, true, true, false]);
    }

    #[test]
    fn test_fence_needs_matching_marker() {
        let mut fences = FenceTracker::default();
        assert!(fences.is_code("~~~~"));
        assert!(fences.is_code("```"));
        assert!(fences.is_code("~~~"));
        assert!(fences.is_code("~~~~~"));
        assert!(!fences.is_code("plain"));
    }

    #[test]
    fn test_split_code_spans() {
        assert_eq!(
            split_code_spans("a `b $x$` c"),
            vec![
                Segment::Text("a "),
                Segment::Code("`b $x$`"),
                Segment::Text(" c")
            ]
        );
    }

    #[test]
    fn test_unclosed_backtick_is_text() {
        assert_eq!(split_code_spans("a ` b"), vec![Segment::Text("a ` b")]);
        assert_eq!(
            split_code_spans("``a`b``"),
            vec![Segment::Code("``a`b``")]
        );
    }
}
