//! Token representation shared by tokenizers and token filters.

use serde::{Deserialize, Serialize};

/// Morphological details attached by the Japanese tokenizer.
///
/// Tokens produced by other tokenizers carry no metadata, which is what
/// lets the Japanese-specific filters pass them through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MorphologyInfo {
    /// Part-of-speech path, most general first (e.g. `["助詞", "格助詞", "一般"]`).
    pub part_of_speech: Vec<String>,
    /// Dictionary base form, if the dictionary knows one.
    pub base_form: Option<String>,
    /// Katakana reading, if known.
    pub reading: Option<String>,
}

impl MorphologyInfo {
    /// The part-of-speech path joined with `-`, as used by stop-tag lists.
    pub fn part_of_speech_tag(&self) -> String {
        self.part_of_speech.join("-")
    }
}

/// A single token in a token stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The token text.
    pub text: String,
    /// Byte offset of the token start in the analyzed input.
    pub start_offset: usize,
    /// Byte offset of the token end in the analyzed input.
    pub end_offset: usize,
    /// Position of the token in the stream.
    pub position: usize,
    /// Japanese morphological metadata.
    pub morphology: Option<MorphologyInfo>,
}

impl Token {
    pub fn new(
        text: impl Into<String>,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            start_offset,
            end_offset,
            position,
            morphology: None,
        }
    }

    pub fn with_morphology(mut self, morphology: MorphologyInfo) -> Self {
        self.morphology = Some(morphology);
        self
    }

    /// Replace the token text, keeping offsets and position.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A sequence of tokens flowing through an analysis chain.
pub type TokenStream = Vec<Token>;

/// Returns true if `c` belongs to a Japanese script (kana or CJK ideograph).
pub fn is_japanese_char(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}'   // hiragana
        | '\u{30A0}'..='\u{30FF}' // katakana
        | '\u{31F0}'..='\u{31FF}' // katakana phonetic extensions
        | '\u{3005}'              // 々
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{F900}'..='\u{FAFF}' // CJK compatibility ideographs
        | '\u{FF66}'..='\u{FF9F}' // halfwidth katakana
    )
}

/// Returns true if `c` is a katakana letter (including the prolonged sound mark).
pub fn is_katakana(c: char) -> bool {
    matches!(c, '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9F}')
}

/// Returns true if the text contains only Latin letters, digits, and apostrophes.
pub fn is_latin_word(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '\'' || c == '’' || is_latin_letter(c))
}

fn is_latin_letter(c: char) -> bool {
    matches!(c, '\u{00C0}'..='\u{024F}') && c.is_alphabetic()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_detection() {
        assert!(is_japanese_char('猫'));
        assert!(is_japanese_char('が'));
        assert!(is_japanese_char('ア'));
        assert!(!is_japanese_char('a'));
        assert!(is_katakana('ー'));
        assert!(!is_katakana('が'));
    }

    #[test]
    fn test_latin_word() {
        assert!(is_latin_word("café"));
        assert!(is_latin_word("dog's"));
        assert!(!is_latin_word("猫"));
        assert!(!is_latin_word(""));
    }

    #[test]
    fn test_part_of_speech_tag() {
        let info = MorphologyInfo {
            part_of_speech: vec!["助詞".into(), "格助詞".into(), "一般".into()],
            base_form: Some("が".into()),
            reading: None,
        };
        assert_eq!(info.part_of_speech_tag(), "助詞-格助詞-一般");
    }
}
