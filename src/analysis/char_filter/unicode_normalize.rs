//! Unicode NFKC normalization with case folding.

use unicode_normalization::UnicodeNormalization;

use super::CharFilter;

/// Apply NFKC normalization followed by case folding.
///
/// Width variants, compatibility ideographs and ligatures collapse to their
/// canonical forms, so `ＡＢＣ` and `ｱｲｳ` become `abc` and `アイウ`.
pub fn nfkc_casefold(input: &str) -> String {
    let folded: String = input.nfkc().flat_map(char::to_lowercase).collect();
    // Lowercasing can produce sequences that are not NFKC-stable (e.g. `İ`).
    folded.nfkc().collect()
}

/// Char filter form of [`nfkc_casefold`].
#[derive(Debug, Clone, Default)]
pub struct IcuNormalizerCharFilter;

impl IcuNormalizerCharFilter {
    pub fn new() -> Self {
        IcuNormalizerCharFilter
    }
}

impl CharFilter for IcuNormalizerCharFilter {
    fn filter(&self, input: &str) -> String {
        nfkc_casefold(input)
    }

    fn name(&self) -> &'static str {
        "icu_normalizer"
    }
}
