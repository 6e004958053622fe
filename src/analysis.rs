//! Text analysis for the status index.
//!
//! Provides the analyzers the search engine applies to each field at index
//! time, so that documents can be inspected and tested with the exact token
//! streams the index will hold.
//!
//! ```text
//! Text → Char Filters → Tokenizer → Token Filters → Tokens
//! ```
//!
//! # Analyzers
//!
//! - `verbatim`: URL/e-mail preserving tokenizer, lowercase.
//! - `content`: Japanese morphological tokenizer followed by Japanese and
//!   English normalization and stemming. Works on mixed-language text.
//! - `ja_default_analyzer`: Japanese tokenizer only.
//! - `hashtag`: whole tag, split on case/digit/symbol boundaries.
//!
//! # Examples
//!
//! ```no_run
//! use status_index::analysis::{AnalyzerRegistry, registry};
//!
//! let analyzers = AnalyzerRegistry::standard().unwrap();
//! let terms = analyzers.terms(registry::HASHTAG, "ChewySearch2024").unwrap();
//! assert_eq!(terms, vec!["chewy", "search", "2024"]);
//! ```

pub mod analyzer;
pub mod char_filter;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::registry;
pub use analyzer::{Analyzer, AnalyzerRegistry, PipelineAnalyzer};
pub use char_filter::CharFilter;
pub use token::{MorphologyInfo, Token, TokenStream};
pub use token_filter::Filter as TokenFilter;
pub use tokenizer::Tokenizer;
