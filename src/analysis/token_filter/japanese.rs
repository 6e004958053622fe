//! Filters over tokens produced by the Japanese tokenizer.
//!
//! Each filter leaves tokens without [`MorphologyInfo`] or without
//! Japanese characters untouched.

use std::collections::HashSet;

use super::Filter;
use crate::analysis::token::{MorphologyInfo, Token, TokenStream, is_japanese_char, is_katakana};
use crate::error::Result;

const PROLONGED_SOUND_MARK: char = 'ー';

/// Default minimum length of katakana tokens stemmed by [`KatakanaStemFilter`].
pub const DEFAULT_MINIMUM_KATAKANA_LENGTH: usize = 4;

/// Part-of-speech tags removed by default: particles, auxiliary verbs,
/// symbols, conjunctions, fillers and non-verbal sounds.
pub const DEFAULT_STOP_TAGS: &[&str] = &[
    "接続詞",
    "助詞",
    "助詞-格助詞",
    "助詞-格助詞-一般",
    "助詞-格助詞-引用",
    "助詞-格助詞-連語",
    "助詞-接続助詞",
    "助詞-係助詞",
    "助詞-副助詞",
    "助詞-間投助詞",
    "助詞-並立助詞",
    "助詞-終助詞",
    "助詞-副助詞／並立助詞／終助詞",
    "助詞-連体化",
    "助詞-副詞化",
    "助詞-特殊",
    "助動詞",
    "記号",
    "記号-一般",
    "記号-読点",
    "記号-句点",
    "記号-空白",
    "記号-括弧開",
    "記号-括弧閉",
    "その他-間投",
    "フィラー",
    "非言語音",
];

fn is_japanese_token(token: &Token) -> bool {
    token.morphology.is_some() && token.text.chars().any(is_japanese_char)
}

/// Removes the trailing prolonged sound mark from long katakana words
/// (`コンピューター` → `コンピュータ`).
#[derive(Debug, Clone)]
pub struct KatakanaStemFilter {
    minimum_length: usize,
}

impl KatakanaStemFilter {
    pub fn new() -> Self {
        KatakanaStemFilter {
            minimum_length: DEFAULT_MINIMUM_KATAKANA_LENGTH,
        }
    }

    pub fn with_minimum_length(minimum_length: usize) -> Self {
        KatakanaStemFilter { minimum_length }
    }

    fn stem<'a>(&self, text: &'a str) -> Option<&'a str> {
        if text.chars().count() < self.minimum_length || !text.chars().all(is_katakana) {
            return None;
        }
        text.strip_suffix(PROLONGED_SOUND_MARK)
    }
}

impl Default for KatakanaStemFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for KatakanaStemFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(tokens
            .into_iter()
            .map(|token| {
                if !is_japanese_token(&token) {
                    return token;
                }
                match self.stem(&token.text) {
                    Some(stem) => {
                        let stem = stem.to_string();
                        token.with_text(stem)
                    }
                    None => token,
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "kuromoji_stemmer"
    }
}

/// Rewrites kanji numerals as Arabic digits (`三千二百` → `3200`, `二〇二四` → `2024`).
///
/// Only tokens made entirely of numeral characters and containing at
/// least one kanji numeral are rewritten.
#[derive(Debug, Clone, Default)]
pub struct JapaneseNumberFilter;

impl JapaneseNumberFilter {
    pub fn new() -> Self {
        JapaneseNumberFilter
    }
}

fn digit_value(c: char) -> Option<u128> {
    let value = match c {
        '〇' | '零' => 0,
        '一' | '壱' => 1,
        '二' | '弐' => 2,
        '三' | '参' => 3,
        '四' => 4,
        '五' => 5,
        '六' => 6,
        '七' => 7,
        '八' => 8,
        '九' => 9,
        '0'..='9' => c as u128 - '0' as u128,
        '０'..='９' => c as u128 - '０' as u128,
        _ => return None,
    };
    Some(value)
}

fn small_unit(c: char) -> Option<u128> {
    match c {
        '十' => Some(10),
        '百' => Some(100),
        '千' => Some(1_000),
        _ => None,
    }
}

fn large_unit(c: char) -> Option<u128> {
    match c {
        '万' => Some(10_000),
        '億' => Some(100_000_000),
        '兆' => Some(1_000_000_000_000),
        _ => None,
    }
}

fn is_kanji_numeral(c: char) -> bool {
    !c.is_ascii_digit()
        && !('０'..='９').contains(&c)
        && (digit_value(c).is_some() || small_unit(c).is_some() || large_unit(c).is_some())
}

/// Parse a Japanese numeral. Returns `None` if the text is not a numeral.
pub fn parse_japanese_number(text: &str) -> Option<u128> {
    if text.is_empty() || !text.chars().any(is_kanji_numeral) {
        return None;
    }

    let mut total: u128 = 0;
    let mut section: u128 = 0;
    let mut current: Option<u128> = None;

    for c in text.chars() {
        if let Some(d) = digit_value(c) {
            current = Some(current.unwrap_or(0).checked_mul(10)?.checked_add(d)?);
        } else if let Some(unit) = small_unit(c) {
            section = section.checked_add(current.unwrap_or(1).checked_mul(unit)?)?;
            current = None;
        } else if let Some(unit) = large_unit(c) {
            let block = section.checked_add(current.unwrap_or(0))?;
            let block = if block == 0 { 1 } else { block };
            total = total.checked_add(block.checked_mul(unit)?)?;
            section = 0;
            current = None;
        } else {
            return None;
        }
    }

    total.checked_add(section)?.checked_add(current.unwrap_or(0))
}

impl Filter for JapaneseNumberFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(tokens
            .into_iter()
            .map(|token| {
                if !is_japanese_token(&token) {
                    return token;
                }
                match parse_japanese_number(&token.text) {
                    Some(n) => token.with_text(n.to_string()),
                    None => token,
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "kuromoji_number"
    }
}

/// Replaces inflected words with their dictionary base form (`食べた` → `食べる`).
#[derive(Debug, Clone, Default)]
pub struct BaseFormFilter;

impl BaseFormFilter {
    pub fn new() -> Self {
        BaseFormFilter
    }
}

impl Filter for BaseFormFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(tokens
            .into_iter()
            .map(|token| {
                let base = token
                    .morphology
                    .as_ref()
                    .and_then(|m| m.base_form.clone())
                    .filter(|base| *base != token.text);
                match base {
                    Some(base) => token.with_text(base),
                    None => token,
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "kuromoji_baseform"
    }
}

/// Drops tokens whose part of speech is in the stop-tag set.
#[derive(Debug, Clone)]
pub struct PartOfSpeechStopFilter {
    stop_tags: HashSet<String>,
}

impl PartOfSpeechStopFilter {
    pub fn new() -> Self {
        Self::with_stop_tags(DEFAULT_STOP_TAGS.iter().copied())
    }

    pub fn with_stop_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Self {
        PartOfSpeechStopFilter {
            stop_tags: tags.into_iter().map(str::to_string).collect(),
        }
    }

    fn is_stopped(&self, morphology: &MorphologyInfo) -> bool {
        !morphology.part_of_speech.is_empty()
            && self.stop_tags.contains(&morphology.part_of_speech_tag())
    }
}

impl Default for PartOfSpeechStopFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for PartOfSpeechStopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(tokens
            .into_iter()
            .filter(|token| match &token.morphology {
                Some(morphology) => !self.is_stopped(morphology),
                None => true,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "kuromoji_part_of_speech"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ja(text: &str, pos: &[&str], base: Option<&str>) -> Token {
        Token::new(text, 0, 0, text.len()).with_morphology(MorphologyInfo {
            part_of_speech: pos.iter().map(|p| p.to_string()).collect(),
            base_form: base.map(str::to_string),
            reading: None,
        })
    }

    #[test]
    fn test_katakana_stem() {
        let filter = KatakanaStemFilter::new();
        let out = filter
            .filter(vec![
                ja("コンピューター", &["名詞"], None),
                ja("バター", &["名詞"], None),
                Token::new("コンピューター", 0, 0, 21),
            ])
            .unwrap();
        assert_eq!(out[0].text, "コンピュータ");
        assert_eq!(out[1].text, "バター");
        // no morphology: not produced by the Japanese tokenizer
        assert_eq!(out[2].text, "コンピューター");
    }

    #[test]
    fn test_parse_japanese_number() {
        assert_eq!(parse_japanese_number("三千二百"), Some(3200));
        assert_eq!(parse_japanese_number("二〇二四"), Some(2024));
        assert_eq!(parse_japanese_number("十"), Some(10));
        assert_eq!(parse_japanese_number("二十一"), Some(21));
        assert_eq!(parse_japanese_number("一億二千万"), Some(120_000_000));
        assert_eq!(parse_japanese_number("3千"), Some(3000));
        assert_eq!(parse_japanese_number("万"), Some(10_000));
        assert_eq!(parse_japanese_number("2024"), None);
        assert_eq!(parse_japanese_number("一般"), None);
    }

    #[test]
    fn test_number_filter() {
        let out = JapaneseNumberFilter::new()
            .filter(vec![ja("三千", &["名詞", "数"], None)])
            .unwrap();
        assert_eq!(out[0].text, "3000");
    }

    #[test]
    fn test_base_form() {
        let out = BaseFormFilter::new()
            .filter(vec![
                ja("食べ", &["動詞", "自立"], Some("食べる")),
                ja("猫", &["名詞", "一般"], Some("猫")),
                Token::new("running", 0, 0, 7),
            ])
            .unwrap();
        assert_eq!(out[0].text, "食べる");
        assert_eq!(out[1].text, "猫");
        assert_eq!(out[2].text, "running");
    }

    #[test]
    fn test_part_of_speech_stop() {
        let out = PartOfSpeechStopFilter::new()
            .filter(vec![
                ja("猫", &["名詞", "一般"], None),
                ja("が", &["助詞", "格助詞", "一般"], None),
                ja("好き", &["名詞", "形容動詞語幹"], None),
                ja("です", &["助動詞"], None),
                Token::new("hello", 4, 0, 5),
            ])
            .unwrap();
        let texts: Vec<&str> = out.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["猫", "好き", "hello"]);
    }
}
