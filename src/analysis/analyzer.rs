//! Analyzers: a tokenizer plus char filters and token filters.

pub mod pipeline;
pub mod registry;

pub use pipeline::{PipelineAnalyzer, PipelineAnalyzerBuilder};
pub use registry::AnalyzerRegistry;

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for text analyzers.
pub trait Analyzer: Send + Sync {
    /// Turn raw text into the token stream the index stores.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// The analyzer's registered name.
    fn name(&self) -> &str;

    /// Convenience: the token texts only.
    fn terms(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.analyze(text)?.into_iter().map(|t| t.text).collect())
    }
}
