//! HTML utility functions.
//!
//! - `escape()`, `escape_attr()` - HTML entity escaping
//! - `inject_before()` - splice a snippet before a closing tag

use std::borrow::Cow;

/// Characters that require HTML escaping.
const ESCAPE_CHARS: [char; 5] = ['<', '>', '&', '"', '\''];

/// Get the HTML entity for a special character.
#[inline]
fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        '\'' => Some("&#39;"),
        _ => None,
    }
}

/// Escape HTML special characters in text content.
///
/// Uses `Cow` to avoid allocation when no escaping is needed.
#[inline]
pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(ESCAPE_CHARS) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match escape_char(c) {
            Some(entity) => result.push_str(entity),
            None => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Escape HTML attribute values.
#[inline]
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    escape(s)
}

/// Insert `snippet` right before the last `closing` tag (case-insensitive).
///
/// Appends to the end when the tag is missing; browsers tolerate that.
pub fn inject_before(content: &[u8], closing: &str, snippet: &str) -> Vec<u8> {
    let pattern = closing.as_bytes();
    let mut result = Vec::with_capacity(content.len() + snippet.len());

    match content
        .windows(pattern.len())
        .rposition(|w| w.eq_ignore_ascii_case(pattern))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(snippet.as_bytes());
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(snippet.as_bytes());
        }
    }
    result
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain() {
        assert!(matches!(escape("hello"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_special_chars() {
        assert_eq!(escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
        assert_eq!(escape_attr("it's"), "it&#39;s");
    }

    #[test]
    fn test_inject_before_last_match() {
        let html = b"<html><body><p>x</p></BODY></html>";
        let out = inject_before(html, "</body>", "<script></script>");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<html><body><p>x</p><script></script></BODY></html>"
        );
    }

    #[test]
    fn test_inject_before_missing_tag_appends() {
        let out = inject_before(b"<p>x</p>", "</head>", "<meta>");
        assert_eq!(out, b"<p>x</p><meta>");
    }
}
