use super::Filter;
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Lowercases token text.
#[derive(Debug, Clone, Default)]
pub struct LowercaseFilter;

impl LowercaseFilter {
    pub fn new() -> Self {
        LowercaseFilter
    }
}

impl Filter for LowercaseFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(tokens
            .into_iter()
            .map(|token| {
                if token.text.chars().any(char::is_uppercase) {
                    let lowered = token.text.to_lowercase();
                    token.with_text(lowered)
                } else {
                    token
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "lowercase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    #[test]
    fn test_lowercase() {
        let tokens = vec![Token::new("Hello", 0, 0, 5), Token::new("ÉCOLE", 1, 6, 12)];
        let out = LowercaseFilter::new().filter(tokens).unwrap();
        assert_eq!(out[0].text, "hello");
        assert_eq!(out[1].text, "école");
        assert_eq!(out[1].start_offset, 6);
    }
}
