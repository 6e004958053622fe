//! Japanese iteration mark expansion.

use super::CharFilter;

const KANJI_MARK: char = '々';
const HIRAGANA_MARK: char = 'ゝ';
const HIRAGANA_VOICED_MARK: char = 'ゞ';
const KATAKANA_MARK: char = 'ヽ';
const KATAKANA_VOICED_MARK: char = 'ヾ';

/// Replaces iteration marks with the characters they repeat.
///
/// `時々` becomes `時時` and `こゝろ` becomes `こころ`. A run of `n` marks
/// repeats the `n` characters preceding the run. Marks that have nothing
/// suitable to repeat are left in place.
#[derive(Debug, Clone)]
pub struct IterationMarkCharFilter {
    normalize_kanji: bool,
    normalize_kana: bool,
}

impl IterationMarkCharFilter {
    pub fn new() -> Self {
        IterationMarkCharFilter {
            normalize_kanji: true,
            normalize_kana: true,
        }
    }

    fn handles(&self, c: char) -> bool {
        match c {
            KANJI_MARK => self.normalize_kanji,
            HIRAGANA_MARK | HIRAGANA_VOICED_MARK | KATAKANA_MARK | KATAKANA_VOICED_MARK => {
                self.normalize_kana
            }
            _ => false,
        }
    }
}

impl Default for IterationMarkCharFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl CharFilter for IterationMarkCharFilter {
    fn filter(&self, input: &str) -> String {
        if !input.chars().any(|c| self.handles(c)) {
            return input.to_string();
        }

        let chars: Vec<char> = input.chars().collect();
        let mut out: Vec<char> = Vec::with_capacity(chars.len());
        let mut i = 0;

        while i < chars.len() {
            if !self.handles(chars[i]) {
                out.push(chars[i]);
                i += 1;
                continue;
            }

            let run_start = i;
            while i < chars.len() && self.handles(chars[i]) {
                i += 1;
            }
            let run = &chars[run_start..i];

            if out.len() < run.len() {
                out.extend_from_slice(run);
                continue;
            }

            let source_start = out.len() - run.len();
            for (offset, &mark) in run.iter().enumerate() {
                let source = out[source_start + offset];
                out.push(expand(mark, source).unwrap_or(mark));
            }
        }

        out.into_iter().collect()
    }

    fn name(&self) -> &'static str {
        "kuromoji_iteration_mark"
    }
}

fn expand(mark: char, source: char) -> Option<char> {
    match mark {
        KANJI_MARK if is_kanji(source) => Some(source),
        HIRAGANA_MARK if is_hiragana(source) => Some(unvoiced(source)),
        HIRAGANA_VOICED_MARK if is_hiragana(source) => Some(voiced(unvoiced(source))),
        KATAKANA_MARK if is_katakana(source) => Some(unvoiced(source)),
        KATAKANA_VOICED_MARK if is_katakana(source) => Some(voiced(unvoiced(source))),
        _ => None,
    }
}

fn is_kanji(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}

fn is_hiragana(c: char) -> bool {
    matches!(c, '\u{3041}'..='\u{3096}')
}

fn is_katakana(c: char) -> bool {
    matches!(c, '\u{30A1}'..='\u{30FA}')
}

/// Kana (hiragana offsets) whose voiced form is the next code point.
const VOICEABLE: &[u32] = &[
    0x304B, 0x304D, 0x304F, 0x3051, 0x3053, // か き く け こ
    0x3055, 0x3057, 0x3059, 0x305B, 0x305D, // さ し す せ そ
    0x305F, 0x3061, 0x3064, 0x3066, 0x3068, // た ち つ て と
    0x306F, 0x3072, 0x3075, 0x3078, 0x307B, // は ひ ふ へ ほ
];

const KATAKANA_OFFSET: u32 = 0x60;

fn hiragana_code(c: char) -> (u32, u32) {
    let code = c as u32;
    if is_katakana(c) {
        (code - KATAKANA_OFFSET, KATAKANA_OFFSET)
    } else {
        (code, 0)
    }
}

fn voiced(c: char) -> char {
    let (code, shift) = hiragana_code(c);
    if VOICEABLE.contains(&code) {
        char::from_u32(code + 1 + shift).unwrap_or(c)
    } else {
        c
    }
}

fn unvoiced(c: char) -> char {
    let (code, shift) = hiragana_code(c);
    if code > 0 && VOICEABLE.contains(&(code - 1)) {
        char::from_u32(code - 1 + shift).unwrap_or(c)
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kanji_mark() {
        let filter = IterationMarkCharFilter::new();
        assert_eq!(filter.filter("時々"), "時時");
        assert_eq!(filter.filter("人々が"), "人人が");
    }

    #[test]
    fn test_kana_marks() {
        let filter = IterationMarkCharFilter::new();
        assert_eq!(filter.filter("こゝろ"), "こころ");
        assert_eq!(filter.filter("いすゞ"), "いすず");
        assert_eq!(filter.filter("バナヽ"), "バナナ");
    }

    #[test]
    fn test_run_of_marks_repeats_preceding_characters() {
        let filter = IterationMarkCharFilter::new();
        assert_eq!(filter.filter("馬鹿々々しい"), "馬鹿馬鹿しい");
    }

    #[test]
    fn test_unmatched_marks_are_kept() {
        let filter = IterationMarkCharFilter::new();
        assert_eq!(filter.filter("々"), "々");
        assert_eq!(filter.filter("aゝ"), "aゝ");
    }
}
