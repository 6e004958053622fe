use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use super::Filter;
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Folds Latin letters with diacritics, ligatures and typographic
/// punctuation to their ASCII equivalents (`café` → `cafe`, `straße` → `strasse`).
///
/// Characters outside the Latin and general punctuation blocks are left
/// alone; in particular kana keep their voicing marks.
#[derive(Debug, Clone, Default)]
pub struct AsciiFoldingFilter;

impl AsciiFoldingFilter {
    pub fn new() -> Self {
        AsciiFoldingFilter
    }
}

/// Fold a string to ASCII where a mapping exists.
pub fn fold_to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        if let Some(mapped) = special_fold(c) {
            out.push_str(mapped);
            continue;
        }
        if is_latin_extended(c) {
            let stripped: String = c.to_string().nfd().filter(|m| !is_combining_mark(*m)).collect();
            if stripped.is_ascii() && !stripped.is_empty() {
                out.push_str(&stripped);
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn is_latin_extended(c: char) -> bool {
    matches!(c, '\u{00C0}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}')
}

fn special_fold(c: char) -> Option<&'static str> {
    let folded = match c {
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'ø' => "o",
        'Ø' => "O",
        'đ' | 'ð' => "d",
        'Đ' | 'Ð' => "D",
        'ł' => "l",
        'Ł' => "L",
        'þ' => "th",
        'Þ' => "TH",
        'ı' => "i",
        'ĸ' => "q",
        'ﬀ' => "ff",
        'ﬁ' => "fi",
        'ﬂ' => "fl",
        '‘' | '’' | '‚' | '‛' => "'",
        '“' | '”' | '„' | '‟' => "\"",
        '‐' | '‑' | '‒' | '–' | '—' => "-",
        '…' => "...",
        '\u{00A0}' => " ",
        _ => return None,
    };
    Some(folded)
}

impl Filter for AsciiFoldingFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(tokens
            .into_iter()
            .map(|token| {
                if token.text.is_ascii() {
                    token
                } else {
                    let folded = fold_to_ascii(&token.text);
                    token.with_text(folded)
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "asciifolding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folds_diacritics() {
        assert_eq!(fold_to_ascii("café"), "cafe");
        assert_eq!(fold_to_ascii("naïve résumé"), "naive resume");
        assert_eq!(fold_to_ascii("Straße"), "Strasse");
        assert_eq!(fold_to_ascii("smørrebrød"), "smorrebrod");
    }

    #[test]
    fn test_leaves_kana_voicing_alone() {
        assert_eq!(fold_to_ascii("ガギグ"), "ガギグ");
        assert_eq!(fold_to_ascii("が"), "が");
    }
}
