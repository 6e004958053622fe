//! Japanese morphological tokenizer backed by Lindera and the IPADIC dictionary.
//!
//! The tokenizer segments CJK text with a dictionary lattice and attaches
//! part-of-speech, base form and reading to every token, which the
//! Japanese token filters rely on. Latin words come out as unknown-word
//! tokens and flow through the same chain.

use std::fmt;
use std::sync::Arc;

use lindera::dictionary::load_dictionary;
use lindera::mode::{Mode, Penalty};
use lindera::segmenter::Segmenter;
use lindera::tokenizer::Tokenizer as LinderaTokenizer;

use super::Tokenizer;
use crate::analysis::token::{MorphologyInfo, Token, TokenStream};
use crate::error::{IndexerError, Result};

/// Dictionary URI of the embedded IPADIC.
pub const IPADIC_URI: &str = "embedded://ipadic";

/// Index of the base form in an IPADIC feature row.
const BASE_FORM_FIELD: usize = 6;
/// Index of the reading in an IPADIC feature row.
const READING_FIELD: usize = 7;
/// Number of part-of-speech levels in an IPADIC feature row.
const POS_LEVELS: usize = 4;

/// Segmentation granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JapaneseTokenizerMode {
    /// Plain lattice segmentation.
    Normal,
    /// Additionally decompose long compounds (e.g. 関西国際空港 → 関西 / 国際 / 空港),
    /// which favours recall in search.
    #[default]
    Search,
}

impl JapaneseTokenizerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JapaneseTokenizerMode::Normal => "normal",
            JapaneseTokenizerMode::Search => "search",
        }
    }

    fn lindera_mode(&self) -> Mode {
        match self {
            JapaneseTokenizerMode::Normal => Mode::Normal,
            JapaneseTokenizerMode::Search => Mode::Decompose(Penalty::default()),
        }
    }
}

/// Lindera-backed tokenizer.
#[derive(Clone)]
pub struct JapaneseTokenizer {
    inner: Arc<LinderaTokenizer>,
    mode: JapaneseTokenizerMode,
    discard_punctuation: bool,
}

impl fmt::Debug for JapaneseTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JapaneseTokenizer")
            .field("mode", &self.mode)
            .field("discard_punctuation", &self.discard_punctuation)
            .finish()
    }
}

impl JapaneseTokenizer {
    /// Create a tokenizer over the embedded IPADIC dictionary.
    pub fn new(mode: JapaneseTokenizerMode) -> Result<Self> {
        let dictionary = load_dictionary(IPADIC_URI).map_err(|e| {
            IndexerError::analysis(format!("failed to load dictionary {IPADIC_URI}: {e}"))
        })?;
        let segmenter = Segmenter::new(mode.lindera_mode(), dictionary, None);

        Ok(JapaneseTokenizer {
            inner: Arc::new(LinderaTokenizer::new(segmenter)),
            mode,
            discard_punctuation: true,
        })
    }

    /// Keep or drop tokens made only of whitespace and punctuation.
    pub fn with_discard_punctuation(mut self, discard: bool) -> Self {
        self.discard_punctuation = discard;
        self
    }

    pub fn mode(&self) -> JapaneseTokenizerMode {
        self.mode
    }
}

impl Tokenizer for JapaneseTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let mut lindera_tokens = self
            .inner
            .tokenize(text)
            .map_err(|e| IndexerError::analysis(format!("japanese tokenization failed: {e}")))?;

        let mut tokens = Vec::with_capacity(lindera_tokens.len());
        let mut position = 0;

        for token in lindera_tokens.iter_mut() {
            let surface = token.surface.to_string();
            let (start, end) = (token.byte_start, token.byte_end);

            if self.discard_punctuation && is_punctuation(&surface) {
                continue;
            }

            let details = token.details();
            let morphology = morphology_from_details(&details);

            tokens.push(Token::new(surface, position, start, end).with_morphology(morphology));
            position += 1;
        }

        Ok(tokens)
    }

    fn name(&self) -> &'static str {
        "kuromoji_tokenizer"
    }
}

fn is_punctuation(surface: &str) -> bool {
    !surface.chars().any(char::is_alphanumeric)
}

fn morphology_from_details(details: &[&str]) -> MorphologyInfo {
    let field = |idx: usize| {
        details
            .get(idx)
            .filter(|v| !v.is_empty() && **v != "*")
            .map(|v| v.to_string())
    };

    let part_of_speech = details
        .iter()
        .take(POS_LEVELS)
        .filter(|v| !v.is_empty() && **v != "*" && **v != "UNK")
        .map(|v| v.to_string())
        .collect();

    MorphologyInfo {
        part_of_speech,
        base_form: field(BASE_FORM_FIELD),
        reading: field(READING_FIELD),
    }
}
