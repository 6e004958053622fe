//! Named analyzers used by the status index.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Analyzer, PipelineAnalyzer};
use crate::analysis::char_filter::{
    HtmlStripCharFilter, IcuNormalizerCharFilter, IterationMarkCharFilter,
};
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::{
    AsciiFoldingFilter, BaseFormFilter, CjkWidthFilter, ElisionFilter, EnglishPossessiveFilter,
    EnglishStemFilter, EnglishStopFilter, IcuNormalizerFilter, JapaneseNumberFilter,
    KatakanaStemFilter, LowercaseFilter, PartOfSpeechStopFilter, WordDelimiterFilter,
};
use crate::analysis::tokenizer::{
    JapaneseTokenizer, JapaneseTokenizerMode, KeywordTokenizer, Tokenizer, UrlEmailTokenizer,
};
use crate::error::{IndexerError, Result};

/// URL/e-mail preserving, lowercase only.
pub const VERBATIM: &str = "verbatim";
/// Heavy multilingual stemming analyzer.
pub const CONTENT: &str = "content";
/// Japanese tokenizer only.
pub const JA_DEFAULT: &str = "ja_default_analyzer";
/// Keyword-style analyzer for hashtags.
pub const HASHTAG: &str = "hashtag";

/// Short alias accepted for [`JA_DEFAULT`].
const JA_DEFAULT_ALIAS: &str = "ja_default";

/// Registry of analyzers by name.
///
/// The Japanese dictionary is loaded once and the tokenizer is shared by
/// every analyzer that segments Japanese text.
#[derive(Clone)]
pub struct AnalyzerRegistry {
    analyzers: HashMap<String, Arc<dyn Analyzer>>,
}

impl std::fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.analyzers.keys().collect();
        names.sort();
        f.debug_struct("AnalyzerRegistry")
            .field("analyzers", &names)
            .finish()
    }
}

impl AnalyzerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        AnalyzerRegistry {
            analyzers: HashMap::new(),
        }
    }

    /// The registry with `verbatim`, `content`, `ja_default_analyzer` and `hashtag`.
    pub fn standard() -> Result<Self> {
        let japanese: Arc<dyn Tokenizer> =
            Arc::new(JapaneseTokenizer::new(JapaneseTokenizerMode::Search)?);

        let mut registry = Self::new();
        registry.register(Arc::new(verbatim_analyzer()?));
        registry.register(Arc::new(content_analyzer(japanese.clone())?));
        registry.register(Arc::new(ja_default_analyzer(japanese)?));
        registry.register(Arc::new(hashtag_analyzer()?));
        Ok(registry)
    }

    /// Register an analyzer under its own name, replacing any previous one.
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        self.analyzers.insert(analyzer.name().to_string(), analyzer);
    }

    /// Look up an analyzer by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Analyzer>> {
        let name = if name == JA_DEFAULT_ALIAS { JA_DEFAULT } else { name };
        self.analyzers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Analyze `text` with the named analyzer.
    pub fn analyze(&self, name: &str, text: &str) -> Result<TokenStream> {
        let analyzer = self
            .get(name)
            .ok_or_else(|| IndexerError::invalid_argument(format!("unknown analyzer `{name}`")))?;
        analyzer.analyze(text)
    }

    /// Analyze `text` and return the token texts.
    pub fn terms(&self, name: &str, text: &str) -> Result<Vec<String>> {
        Ok(self
            .analyze(name, text)?
            .into_iter()
            .map(|t| t.text)
            .collect())
    }

    /// Registered analyzer names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.analyzers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn verbatim_analyzer() -> Result<PipelineAnalyzer> {
    PipelineAnalyzer::builder(VERBATIM)
        .tokenizer(Arc::new(UrlEmailTokenizer::new()))
        .filter(LowercaseFilter::new())
        .build()
}

pub fn content_analyzer(japanese: Arc<dyn Tokenizer>) -> Result<PipelineAnalyzer> {
    PipelineAnalyzer::builder(CONTENT)
        .char_filter(IcuNormalizerCharFilter::new())
        .char_filter(HtmlStripCharFilter::new())
        .char_filter(IterationMarkCharFilter::new())
        .tokenizer(japanese)
        .filter(KatakanaStemFilter::new())
        .filter(JapaneseNumberFilter::new())
        .filter(BaseFormFilter::new())
        .filter(PartOfSpeechStopFilter::new())
        .filter(IcuNormalizerFilter::new())
        .filter(LowercaseFilter::new())
        .filter(AsciiFoldingFilter::new())
        .filter(CjkWidthFilter::new())
        .filter(ElisionFilter::new())
        .filter(EnglishPossessiveFilter::new())
        .filter(EnglishStopFilter::new())
        .filter(EnglishStemFilter::new())
        .build()
}

pub fn ja_default_analyzer(japanese: Arc<dyn Tokenizer>) -> Result<PipelineAnalyzer> {
    PipelineAnalyzer::builder(JA_DEFAULT)
        .tokenizer(japanese)
        .build()
}

pub fn hashtag_analyzer() -> Result<PipelineAnalyzer> {
    PipelineAnalyzer::builder(HASHTAG)
        .tokenizer(Arc::new(KeywordTokenizer::new()))
        .filter(WordDelimiterFilter::new())
        .filter(LowercaseFilter::new())
        .filter(AsciiFoldingFilter::new())
        .filter(CjkWidthFilter::new())
        .build()
}
