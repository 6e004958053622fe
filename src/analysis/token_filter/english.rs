//! English possessive stripping, stop words and stemming.
//!
//! All three filters only touch Latin-script tokens.

use std::collections::HashSet;
use std::fmt;

use rust_stemmers::{Algorithm, Stemmer};

use super::Filter;
use crate::analysis::token::{TokenStream, is_latin_word};
use crate::error::Result;

/// The `_english_` stop word list.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
    "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

/// Removes a trailing possessive `'s` (`dog's` → `dog`).
#[derive(Debug, Clone, Default)]
pub struct EnglishPossessiveFilter;

impl EnglishPossessiveFilter {
    pub fn new() -> Self {
        EnglishPossessiveFilter
    }
}

fn strip_possessive(text: &str) -> Option<&str> {
    for suffix in ["'s", "'S", "’s", "’S", "＇s", "＇S"] {
        if let Some(stem) = text.strip_suffix(suffix) {
            if !stem.is_empty() {
                return Some(stem);
            }
        }
    }
    None
}

impl Filter for EnglishPossessiveFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(tokens
            .into_iter()
            .map(|token| match strip_possessive(&token.text) {
                Some(stem) => {
                    let stem = stem.to_string();
                    token.with_text(stem)
                }
                None => token,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "english_possessive_stemmer"
    }
}

/// Drops English stop words. Matching is exact, so it belongs after lowercasing.
#[derive(Debug, Clone)]
pub struct EnglishStopFilter {
    stop_words: HashSet<String>,
}

impl EnglishStopFilter {
    pub fn new() -> Self {
        Self::with_words(ENGLISH_STOP_WORDS.iter().copied())
    }

    pub fn with_words<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        EnglishStopFilter {
            stop_words: words.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }
}

impl Default for EnglishStopFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for EnglishStopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(tokens
            .into_iter()
            .filter(|token| !self.is_stop_word(&token.text))
            .collect())
    }

    fn name(&self) -> &'static str {
        "english_stop"
    }
}

/// Snowball English stemmer (`running` → `run`).
pub struct EnglishStemFilter {
    stemmer: Stemmer,
}

impl fmt::Debug for EnglishStemFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnglishStemFilter").finish()
    }
}

impl EnglishStemFilter {
    pub fn new() -> Self {
        EnglishStemFilter {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    pub fn stem(&self, word: &str) -> String {
        self.stemmer.stem(word).into_owned()
    }
}

impl Default for EnglishStemFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for EnglishStemFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(tokens
            .into_iter()
            .map(|token| {
                if is_latin_word(&token.text) {
                    let stemmed = self.stem(&token.text);
                    token.with_text(stemmed)
                } else {
                    token
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "english_stemmer"
    }
}
