//! HTML markup removal.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::CharFilter;

lazy_static! {
    static ref SCRIPT: Regex = Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap();
    static ref STYLE: Regex = Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap();
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref BLOCK_TAG: Regex = Regex::new(
        r"(?i)</?(?:p|br|div|li|ul|ol|h[1-6]|blockquote|pre|tr|td|th|table)\b[^>]*>"
    )
    .unwrap();
    static ref ANY_TAG: Regex = Regex::new(r"</?[a-zA-Z][^>]*>").unwrap();
    static ref ENTITY: Regex = Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap();
}

/// Strips HTML tags and decodes character entities.
///
/// Block-level tags become line breaks so that words on either side of a
/// `<br>` or `</p>` are not glued together. Script and style bodies are
/// dropped entirely.
#[derive(Debug, Clone, Default)]
pub struct HtmlStripCharFilter;

impl HtmlStripCharFilter {
    pub fn new() -> Self {
        HtmlStripCharFilter
    }
}

impl CharFilter for HtmlStripCharFilter {
    fn filter(&self, input: &str) -> String {
        if !input.contains('<') && !input.contains('&') {
            return input.to_string();
        }

        let text = SCRIPT.replace_all(input, "");
        let text = STYLE.replace_all(&text, "");
        let text = COMMENT.replace_all(&text, "");
        let text = BLOCK_TAG.replace_all(&text, "\n");
        let text = ANY_TAG.replace_all(&text, "");
        ENTITY
            .replace_all(&text, |caps: &Captures| {
                decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    fn name(&self) -> &'static str {
        "html_strip"
    }
}

fn decode_entity(entity: &str) -> Option<String> {
    if let Some(num) = entity.strip_prefix('#') {
        let code = if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse::<u32>().ok()?
        };
        return char::from_u32(code).map(String::from);
    }

    let decoded = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{00A0}",
        "hellip" => "…",
        "mdash" => "—",
        "ndash" => "–",
        _ => return None,
    };
    Some(decoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tags() {
        let filter = HtmlStripCharFilter::new();
        let out = filter.filter("<p>Hello <span class=\"h-card\">@alice</span></p><p>bye</p>");
        assert!(out.contains("Hello @alice"));
        assert!(out.contains("bye"));
        assert!(!out.contains('<'));
    }

    #[test]
    fn test_block_tags_separate_words() {
        let filter = HtmlStripCharFilter::new();
        let out = filter.filter("one<br>two");
        assert_eq!(out, "one\ntwo");
    }

    #[test]
    fn test_decodes_entities() {
        let filter = HtmlStripCharFilter::new();
        assert_eq!(filter.filter("a &amp; b &lt;3 &#x263A; &#65;"), "a & b <3 ☺ A");
        assert_eq!(filter.filter("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_drops_script_bodies() {
        let filter = HtmlStripCharFilter::new();
        let out = filter.filter("before<script>alert('x')</script>after");
        assert_eq!(out, "beforeafter");
    }

    #[test]
    fn test_plain_text_is_untouched() {
        let filter = HtmlStripCharFilter::new();
        assert_eq!(filter.filter("1 < 2"), "1 < 2");
    }
}
