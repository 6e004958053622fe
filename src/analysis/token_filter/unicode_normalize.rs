use super::Filter;
use crate::analysis::char_filter::unicode_normalize::nfkc_casefold;
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Applies NFKC normalization with case folding to each token.
#[derive(Debug, Clone, Default)]
pub struct IcuNormalizerFilter;

impl IcuNormalizerFilter {
    pub fn new() -> Self {
        IcuNormalizerFilter
    }
}

impl Filter for IcuNormalizerFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(tokens
            .into_iter()
            .map(|token| {
                let normalized = nfkc_casefold(&token.text);
                token.with_text(normalized)
            })
            .filter(|token| !token.is_empty())
            .collect())
    }

    fn name(&self) -> &'static str {
        "icu_normalizer"
    }
}
