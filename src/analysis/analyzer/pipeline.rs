use std::fmt;
use std::sync::Arc;

use super::Analyzer;
use crate::analysis::char_filter::CharFilter;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::analysis::tokenizer::Tokenizer;
use crate::error::{IndexerError, Result};

/// An analyzer assembled from char filters, a tokenizer and token filters,
/// applied in that order.
#[derive(Clone)]
pub struct PipelineAnalyzer {
    name: String,
    char_filters: Vec<Arc<dyn CharFilter>>,
    tokenizer: Arc<dyn Tokenizer>,
    filters: Vec<Arc<dyn Filter>>,
}

impl PipelineAnalyzer {
    pub fn builder(name: impl Into<String>) -> PipelineAnalyzerBuilder {
        PipelineAnalyzerBuilder {
            name: name.into(),
            char_filters: Vec::new(),
            tokenizer: None,
            filters: Vec::new(),
        }
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Names of the char filters, in application order.
    pub fn char_filter_names(&self) -> Vec<&'static str> {
        self.char_filters.iter().map(|f| f.name()).collect()
    }

    /// Names of the token filters, in application order.
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }
}

impl fmt::Debug for PipelineAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineAnalyzer")
            .field("name", &self.name)
            .field("char_filters", &self.char_filter_names())
            .field("tokenizer", &self.tokenizer.name())
            .field("filters", &self.filter_names())
            .finish()
    }
}

impl Analyzer for PipelineAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let mut filtered = std::borrow::Cow::Borrowed(text);
        for char_filter in &self.char_filters {
            filtered = std::borrow::Cow::Owned(char_filter.filter(&filtered));
        }

        let mut tokens = self.tokenizer.tokenize(&filtered)?;
        for filter in &self.filters {
            tokens = filter.filter(tokens)?;
            tokens.retain(|t| !t.is_empty());
        }
        Ok(tokens)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`PipelineAnalyzer`].
pub struct PipelineAnalyzerBuilder {
    name: String,
    char_filters: Vec<Arc<dyn CharFilter>>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    filters: Vec<Arc<dyn Filter>>,
}

impl PipelineAnalyzerBuilder {
    pub fn char_filter(mut self, filter: impl CharFilter + 'static) -> Self {
        self.char_filters.push(Arc::new(filter));
        self
    }

    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn build(self) -> Result<PipelineAnalyzer> {
        let tokenizer = self.tokenizer.ok_or_else(|| {
            IndexerError::invalid_config(format!("analyzer `{}` has no tokenizer", self.name))
        })?;
        Ok(PipelineAnalyzer {
            name: self.name,
            char_filters: self.char_filters,
            tokenizer,
            filters: self.filters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::char_filter::HtmlStripCharFilter;
    use crate::analysis::token_filter::{LowercaseFilter, WordDelimiterFilter};
    use crate::analysis::tokenizer::{KeywordTokenizer, UrlEmailTokenizer};

    #[test]
    fn test_builder_requires_tokenizer() {
        let err = PipelineAnalyzer::builder("broken").build().unwrap_err();
        assert!(matches!(err, IndexerError::InvalidConfig(_)));
    }

    #[test]
    fn test_stages_run_in_order() {
        let analyzer = PipelineAnalyzer::builder("test")
            .char_filter(HtmlStripCharFilter::new())
            .tokenizer(Arc::new(UrlEmailTokenizer::new()))
            .filter(LowercaseFilter::new())
            .build()
            .unwrap();
        let terms = analyzer.terms("<p>Hello <b>World</b></p>").unwrap();
        assert_eq!(terms, vec!["hello", "world"]);
        assert_eq!(analyzer.filter_names(), vec!["lowercase"]);
    }

    #[test]
    fn test_empty_tokens_are_dropped() {
        let analyzer = PipelineAnalyzer::builder("test")
            .tokenizer(Arc::new(KeywordTokenizer::new()))
            .filter(WordDelimiterFilter::new())
            .build()
            .unwrap();
        assert!(analyzer.terms("--").unwrap().is_empty());
    }
}
