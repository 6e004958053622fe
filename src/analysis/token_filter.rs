//! Token filters that transform, drop, or split tokens.
//!
//! Filters are applied in sequence by a
//! [`PipelineAnalyzer`](crate::analysis::analyzer::PipelineAnalyzer).
//! Filters that only make sense for one script check each token and pass
//! tokens of other scripts through unchanged, so Japanese and English
//! filters can share a chain over mixed-language text.

pub mod ascii_folding;
pub mod cjk_width;
pub mod elision;
pub mod english;
pub mod japanese;
pub mod lowercase;
pub mod unicode_normalize;
pub mod word_delimiter;

pub use ascii_folding::AsciiFoldingFilter;
pub use cjk_width::CjkWidthFilter;
pub use elision::ElisionFilter;
pub use english::{EnglishPossessiveFilter, EnglishStemFilter, EnglishStopFilter};
pub use japanese::{
    BaseFormFilter, JapaneseNumberFilter, KatakanaStemFilter, PartOfSpeechStopFilter,
};
pub use lowercase::LowercaseFilter;
pub use unicode_normalize::IcuNormalizerFilter;
pub use word_delimiter::WordDelimiterFilter;

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for token filters.
pub trait Filter: Send + Sync {
    /// Transform a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Name used in analysis definitions.
    fn name(&self) -> &'static str;
}
