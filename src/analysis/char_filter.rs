//! Character filters applied to raw text before tokenization.

pub mod html_strip;
pub mod iteration_mark;
pub mod unicode_normalize;

pub use html_strip::HtmlStripCharFilter;
pub use iteration_mark::IterationMarkCharFilter;
pub use unicode_normalize::IcuNormalizerCharFilter;

/// Trait for filters that rewrite text before it reaches the tokenizer.
///
/// Offsets of the resulting tokens refer to the filtered text.
pub trait CharFilter: Send + Sync {
    /// Rewrite the input text.
    fn filter(&self, input: &str) -> String;

    /// Name used in analysis definitions.
    fn name(&self) -> &'static str;
}
