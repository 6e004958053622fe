//! Splits hashtag-style words on case changes, letter/digit transitions and delimiters.
//!
//! ```
//! use status_index::analysis::token_filter::{Filter, WordDelimiterFilter};
//! use status_index::analysis::Token;
//!
//! let parts = WordDelimiterFilter::new()
//!     .filter(vec![Token::new("ChewySearch2024", 0, 0, 15)])
//!     .unwrap();
//! let texts: Vec<&str> = parts.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(texts, ["Chewy", "Search", "2024"]);
//! ```

use super::Filter;
use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Lower,
    Upper,
    /// Letters without case (CJK, etc.).
    Letter,
    Digit,
    Delimiter,
}

fn classify(c: char) -> CharClass {
    if c.is_numeric() {
        CharClass::Digit
    } else if c.is_lowercase() {
        CharClass::Lower
    } else if c.is_uppercase() {
        CharClass::Upper
    } else if c.is_alphabetic() {
        CharClass::Letter
    } else {
        CharClass::Delimiter
    }
}

fn is_alpha(class: CharClass) -> bool {
    matches!(class, CharClass::Lower | CharClass::Upper | CharClass::Letter)
}

/// Splits tokens into sub-words at delimiters, case changes and
/// letter/digit transitions (`ChewySearch2024` → `Chewy`, `Search`, `2024`).
///
/// Delimiter characters are dropped, and a trailing English possessive is
/// removed before splitting.
#[derive(Debug, Clone)]
pub struct WordDelimiterFilter {
    split_on_case_change: bool,
    split_on_numerics: bool,
    stem_english_possessive: bool,
    preserve_original: bool,
}

impl WordDelimiterFilter {
    pub fn new() -> Self {
        WordDelimiterFilter {
            split_on_case_change: true,
            split_on_numerics: true,
            stem_english_possessive: true,
            preserve_original: false,
        }
    }

    pub fn split_on_case_change(mut self, enabled: bool) -> Self {
        self.split_on_case_change = enabled;
        self
    }

    pub fn split_on_numerics(mut self, enabled: bool) -> Self {
        self.split_on_numerics = enabled;
        self
    }

    /// Also emit the unsplit token ahead of its parts when it was split.
    pub fn preserve_original(mut self, enabled: bool) -> Self {
        self.preserve_original = enabled;
        self
    }

    fn is_break(&self, last: CharClass, current: CharClass) -> bool {
        if is_alpha(last) && is_alpha(current) {
            return self.split_on_case_change
                && last == CharClass::Lower
                && current == CharClass::Upper;
        }
        if (is_alpha(last) && current == CharClass::Digit)
            || (last == CharClass::Digit && is_alpha(current))
        {
            return self.split_on_numerics;
        }
        false
    }

    /// Returns the byte ranges of the sub-words of `text`.
    fn split(&self, text: &str) -> Vec<(usize, usize)> {
        let mut parts = Vec::new();
        let mut start: Option<usize> = None;
        let mut last = CharClass::Delimiter;

        for (idx, c) in text.char_indices() {
            let class = classify(c);
            if class == CharClass::Delimiter {
                if let Some(s) = start.take() {
                    parts.push((s, idx));
                }
            } else {
                match start {
                    None => start = Some(idx),
                    Some(s) if self.is_break(last, class) => {
                        parts.push((s, idx));
                        start = Some(idx);
                    }
                    Some(_) => {}
                }
            }
            last = class;
        }
        if let Some(s) = start {
            parts.push((s, text.len()));
        }
        parts
    }
}

impl Default for WordDelimiterFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_possessive(text: &str) -> &str {
    ["'s", "'S", "’s", "’S"]
        .iter()
        .find_map(|suffix| text.strip_suffix(suffix))
        .unwrap_or(text)
}

impl Filter for WordDelimiterFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut position = 0;

        for token in tokens {
            let text = if self.stem_english_possessive {
                strip_possessive(&token.text)
            } else {
                token.text.as_str()
            };
            let parts = self.split(text);

            if self.preserve_original && (parts.len() != 1 || parts[0] != (0, token.text.len())) {
                out.push(Token {
                    position,
                    ..token.clone()
                });
            }

            for (start, end) in parts {
                let mut part = Token::new(
                    &text[start..end],
                    position,
                    token.start_offset + start,
                    token.start_offset + end,
                );
                part.morphology = token.morphology.clone();
                out.push(part);
                position += 1;
            }
        }

        Ok(out)
    }

    fn name(&self) -> &'static str {
        "word_delimiter_graph"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(filter: &WordDelimiterFilter, text: &str) -> Vec<String> {
        filter
            .filter(vec![Token::new(text, 0, 0, text.len())])
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_case_and_numeric_splits() {
        let filter = WordDelimiterFilter::new();
        assert_eq!(split(&filter, "ChewySearch2024"), vec!["Chewy", "Search", "2024"]);
        assert_eq!(split(&filter, "wi-fi"), vec!["wi", "fi"]);
        assert_eq!(split(&filter, "SD500"), vec!["SD", "500"]);
    }

    #[test]
    fn test_possessive_is_removed() {
        let filter = WordDelimiterFilter::new();
        assert_eq!(split(&filter, "O'Neil's"), vec!["O", "Neil"]);
    }

    #[test]
    fn test_cjk_is_not_split() {
        let filter = WordDelimiterFilter::new();
        assert_eq!(split(&filter, "猫好き"), vec!["猫好き"]);
    }

    #[test]
    fn test_offsets_follow_parts() {
        let filter = WordDelimiterFilter::new();
        let out = filter
            .filter(vec![Token::new("fooBar", 0, 10, 16)])
            .unwrap();
        assert_eq!(out[1].text, "Bar");
        assert_eq!(out[1].start_offset, 13);
        assert_eq!(out[1].end_offset, 16);
        assert_eq!(out[1].position, 1);
    }

    #[test]
    fn test_delimiters_only() {
        let filter = WordDelimiterFilter::new();
        assert!(split(&filter, "__").is_empty());
    }

    #[test]
    fn test_preserve_original() {
        let filter = WordDelimiterFilter::new().preserve_original(true);
        assert_eq!(split(&filter, "PowerShot"), vec!["PowerShot", "Power", "Shot"]);
        assert_eq!(split(&filter, "plain"), vec!["plain"]);
    }
}
