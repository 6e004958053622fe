use super::Filter;
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Default elided articles (French).
pub const DEFAULT_ARTICLES: &[&str] = &[
    "l", "m", "t", "qu", "n", "s", "j", "d", "c", "jusqu", "quoiqu", "lorsqu", "puisqu",
];

/// Removes elided articles from the front of a token (`l'avion` → `avion`).
#[derive(Debug, Clone)]
pub struct ElisionFilter {
    articles: Vec<String>,
}

impl ElisionFilter {
    pub fn new() -> Self {
        Self::with_articles(DEFAULT_ARTICLES.iter().copied())
    }

    pub fn with_articles<'a>(articles: impl IntoIterator<Item = &'a str>) -> Self {
        ElisionFilter {
            articles: articles.into_iter().map(str::to_lowercase).collect(),
        }
    }

    fn strip<'a>(&self, text: &'a str) -> Option<&'a str> {
        let idx = text.find(['\'', '’'])?;
        let article = &text[..idx];
        let apostrophe_len = text[idx..].chars().next()?.len_utf8();
        let rest = &text[idx + apostrophe_len..];
        if rest.is_empty() {
            return None;
        }
        let lowered = article.to_lowercase();
        self.articles.iter().any(|a| *a == lowered).then_some(rest)
    }
}

impl Default for ElisionFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for ElisionFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(tokens
            .into_iter()
            .map(|token| match self.strip(&token.text) {
                Some(rest) => {
                    let rest = rest.to_string();
                    token.with_text(rest)
                }
                None => token,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "elision"
    }
}
