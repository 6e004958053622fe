//! Tokenizer that emits the whole input as a single token.

use super::Tokenizer;
use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

/// Emits the entire input as one token; empty input yields no tokens.
#[derive(Debug, Clone, Default)]
pub struct KeywordTokenizer;

impl KeywordTokenizer {
    pub fn new() -> Self {
        KeywordTokenizer
    }
}

impl Tokenizer for KeywordTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Token::new(text, 0, 0, text.len())])
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}
