//! UAX#29 word tokenizer that keeps URLs and e-mail addresses whole.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use super::Tokenizer;
use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

/// Default maximum token length, in characters.
pub const DEFAULT_MAX_TOKEN_LENGTH: usize = 255;

lazy_static! {
    static ref URL_OR_EMAIL: Regex = Regex::new(concat!(
        r"(?i)(?:",
        r"(?:https?|ftp)://[^\s<>\x22]+",
        r"|www\.[a-z0-9-]+(?:\.[a-z0-9-]+)+(?:/[^\s<>\x22]*)?",
        r"|mailto:[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}",
        r"|[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}",
        r")"
    ))
    .unwrap();
}

/// Characters trimmed from the end of a matched URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"'];

/// Splits text on Unicode word boundaries, except that URLs and e-mail
/// addresses are emitted as single tokens.
///
/// Segments without any letter or digit (whitespace, punctuation) are
/// dropped. Tokens longer than `max_token_length` characters are split.
#[derive(Debug, Clone)]
pub struct UrlEmailTokenizer {
    max_token_length: usize,
}

impl UrlEmailTokenizer {
    pub fn new() -> Self {
        UrlEmailTokenizer {
            max_token_length: DEFAULT_MAX_TOKEN_LENGTH,
        }
    }

    pub fn with_max_token_length(mut self, max_token_length: usize) -> Self {
        self.max_token_length = max_token_length.max(1);
        self
    }

    fn push_words(&self, text: &str, base: usize, tokens: &mut TokenStream) {
        for (offset, word) in text.split_word_bound_indices() {
            if word.chars().any(char::is_alphanumeric) {
                self.push_token(word, base + offset, tokens);
            }
        }
    }

    fn push_token(&self, text: &str, start: usize, tokens: &mut TokenStream) {
        if text.chars().count() <= self.max_token_length {
            let position = tokens.len();
            tokens.push(Token::new(text, position, start, start + text.len()));
            return;
        }

        let mut chunk_start = 0;
        let mut count = 0;
        for (idx, _) in text.char_indices() {
            if count == self.max_token_length {
                let position = tokens.len();
                tokens.push(Token::new(
                    &text[chunk_start..idx],
                    position,
                    start + chunk_start,
                    start + idx,
                ));
                chunk_start = idx;
                count = 0;
            }
            count += 1;
        }
        if chunk_start < text.len() {
            let position = tokens.len();
            tokens.push(Token::new(
                &text[chunk_start..],
                position,
                start + chunk_start,
                start + text.len(),
            ));
        }
    }
}

impl Default for UrlEmailTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for UrlEmailTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let mut tokens = Vec::new();
        let mut cursor = 0;

        for m in URL_OR_EMAIL.find_iter(text) {
            let matched = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            if matched.is_empty() {
                continue;
            }
            let end = m.start() + matched.len();

            self.push_words(&text[cursor..m.start()], cursor, &mut tokens);
            self.push_token(matched, m.start(), &mut tokens);
            cursor = end;
        }
        self.push_words(&text[cursor..], cursor, &mut tokens);

        Ok(tokens)
    }

    fn name(&self) -> &'static str {
        "uax_url_email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &TokenStream) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_url_is_single_token() {
        let tokenizer = UrlEmailTokenizer::new();
        let tokens = tokenizer.tokenize("Hello WORLD http://example.com/x").unwrap();
        assert_eq!(texts(&tokens), vec!["Hello", "WORLD", "http://example.com/x"]);
        assert_eq!(tokens[2].start_offset, 12);
        assert_eq!(tokens[2].end_offset, 32);
        assert_eq!(tokens[2].position, 2);
    }

    #[test]
    fn test_email_is_single_token() {
        let tokenizer = UrlEmailTokenizer::new();
        let tokens = tokenizer.tokenize("mail alice@example.org today").unwrap();
        assert_eq!(texts(&tokens), vec!["mail", "alice@example.org", "today"]);
    }

    #[test]
    fn test_trailing_punctuation_is_not_part_of_url() {
        let tokenizer = UrlEmailTokenizer::new();
        let tokens = tokenizer.tokenize("see https://example.com/a, then").unwrap();
        assert_eq!(texts(&tokens), vec!["see", "https://example.com/a", "then"]);
    }

    #[test]
    fn test_punctuation_is_dropped() {
        let tokenizer = UrlEmailTokenizer::new();
        let tokens = tokenizer.tokenize("wait... what?!").unwrap();
        assert_eq!(texts(&tokens), vec!["wait", "what"]);
    }

    #[test]
    fn test_long_tokens_are_split() {
        let tokenizer = UrlEmailTokenizer::new().with_max_token_length(4);
        let tokens = tokenizer.tokenize("abcdefghij").unwrap();
        assert_eq!(texts(&tokens), vec!["abcd", "efgh", "ij"]);
    }
}
