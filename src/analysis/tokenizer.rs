//! Tokenizers that split text into candidate tokens.

pub mod japanese;
pub mod keyword;
pub mod url_email;

pub use japanese::{JapaneseTokenizer, JapaneseTokenizerMode};
pub use keyword::KeywordTokenizer;
pub use url_email::UrlEmailTokenizer;

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for tokenizers.
pub trait Tokenizer: Send + Sync {
    /// Split text into tokens with positions and byte offsets.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Name used in analysis definitions.
    fn name(&self) -> &'static str;
}
