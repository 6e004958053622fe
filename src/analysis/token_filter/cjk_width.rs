use unicode_normalization::UnicodeNormalization;

use super::Filter;
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Normalizes CJK width variants: fullwidth ASCII becomes basic Latin and
/// halfwidth katakana becomes fullwidth katakana, composing the halfwidth
/// voiced marks (`ｶﾞ` → `ガ`).
#[derive(Debug, Clone, Default)]
pub struct CjkWidthFilter;

impl CjkWidthFilter {
    pub fn new() -> Self {
        CjkWidthFilter
    }
}

fn is_width_variant(c: char) -> bool {
    matches!(c, '\u{FF01}'..='\u{FF5E}' | '\u{FF61}'..='\u{FF9F}')
}

/// Apply width normalization to a string.
///
/// Only runs of halfwidth/fullwidth form characters are rewritten, so
/// other compatibility characters are untouched.
pub fn normalize_width(text: &str) -> String {
    if !text.chars().any(is_width_variant) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut run = String::new();
    for c in text.chars() {
        if is_width_variant(c) {
            run.push(c);
        } else {
            if !run.is_empty() {
                out.extend(run.nfkc());
                run.clear();
            }
            out.push(c);
        }
    }
    if !run.is_empty() {
        out.extend(run.nfkc());
    }
    out
}

impl Filter for CjkWidthFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(tokens
            .into_iter()
            .map(|token| {
                let normalized = normalize_width(&token.text);
                token.with_text(normalized)
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "cjk_width"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullwidth_ascii() {
        assert_eq!(normalize_width("Ｒｕｓｔ２０２４"), "Rust2024");
    }

    #[test]
    fn test_halfwidth_katakana() {
        assert_eq!(normalize_width("ｶﾞｯｺｳ"), "ガッコウ");
        assert_eq!(normalize_width("ﾊﾟﾝ"), "パン");
    }

    #[test]
    fn test_other_text_untouched() {
        assert_eq!(normalize_width("①abc"), "①abc");
    }
}
