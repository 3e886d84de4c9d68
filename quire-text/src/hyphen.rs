//! Hyphenation break-point providers.
//!
//! A hyphenator returns char offsets inside a word where a line may be
//! broken with a visible hyphen. Offsets are strictly between `0` and the
//! word length and ascending. Soft hyphens (U+00AD) in the text are break
//! points regardless of which hyphenator is configured.

use rustc_hash::FxHashMap;

/// Soft hyphen: an invisible break opportunity that shows a hyphen when used.
pub const SOFT_HYPHEN: char = '\u{00AD}';

pub trait Hyphenator {
    /// Break offsets (in chars) for `word`, given the language tag of its
    /// first character. An unsupported language yields no points.
    fn break_points(&self, word: &str, lang: &str) -> Vec<usize>;
}

/// Exact-word hyphenation from a list like `un-der-stand-ing`.
///
/// Lookup is case-insensitive and ignores the language tag.
#[derive(Clone, Debug, Default)]
pub struct DictionaryHyphenator {
    words: FxHashMap<String, Vec<usize>>,
}

impl DictionaryHyphenator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from hyphen-separated entries.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a str>) -> Self {
        let mut dict = Self::new();
        for entry in entries {
            dict.add(entry);
        }
        dict
    }

    /// Add one entry; a later entry for the same word replaces the earlier.
    pub fn add(&mut self, entry: &str) {
        let mut word = String::with_capacity(entry.len());
        let mut points = Vec::new();
        let mut len = 0usize;
        for ch in entry.chars() {
            if ch == '-' {
                if len > 0 && points.last() != Some(&len) {
                    points.push(len);
                }
            } else {
                word.extend(ch.to_lowercase());
                len += 1;
            }
        }
        points.retain(|&p| p < len);
        self.words.insert(word, points);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Hyphenator for DictionaryHyphenator {
    fn break_points(&self, word: &str, _lang: &str) -> Vec<usize> {
        let key: String = word.chars().flat_map(char::to_lowercase).collect();
        self.words.get(&key).cloned().unwrap_or_default()
    }
}

/// Heuristic English hyphenation.
///
/// Breaks at vowel/consonant transitions and before common suffixes,
/// keeping at least three letters on each side; a small exception list
/// covers words the heuristic gets wrong. Words shorter than seven letters
/// are never split. Applies to `en*` tags and to untagged text.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnglishHyphenator;

const MIN_WORD: usize = 7;
const MIN_SIDE: usize = 3;

const SUFFIXES: &[&str] = &[
    "tion", "sion", "ment", "ness", "less", "able", "ible", "ally", "ingly", "edly", "ing", "ed",
    "ly",
];

impl Hyphenator for EnglishHyphenator {
    fn break_points(&self, word: &str, lang: &str) -> Vec<usize> {
        let lang = lang.to_ascii_lowercase();
        if !(lang.is_empty() || lang == "en" || lang.starts_with("en-")) {
            return Vec::new();
        }

        let chars: Vec<char> = word.chars().collect();
        if chars.len() < MIN_WORD || !chars.iter().all(|c| c.is_ascii_alphabetic()) {
            return Vec::new();
        }

        let lower = word.to_ascii_lowercase();
        if let Some(points) = exception(&lower) {
            return points.to_vec();
        }

        let is_vowel = |c: char| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        let mut points = Vec::new();
        for i in MIN_SIDE..=(chars.len() - MIN_SIDE) {
            if is_vowel(chars[i - 1]) != is_vowel(chars[i]) {
                points.push(i);
            }
        }
        for suffix in SUFFIXES {
            if lower.ends_with(suffix) {
                let split = chars.len() - suffix.len();
                if split >= MIN_SIDE && split + MIN_SIDE <= chars.len() {
                    points.push(split);
                }
            }
        }

        points.sort_unstable();
        points.dedup();
        points
    }
}

fn exception(word: &str) -> Option<&'static [usize]> {
    match word {
        "accessibility" => Some(&[3, 6, 9]),
        "characteristically" => Some(&[4, 6, 9, 12]),
        "extraordinary" => Some(&[5, 8]),
        "functionality" => Some(&[4, 7, 10]),
        "fundamental" => Some(&[3, 6]),
        "hyphenation" => Some(&[2, 6]),
        "language" => Some(&[3]),
        "publication" => Some(&[3, 6]),
        "responsibility" => Some(&[3, 6, 9]),
        "typesetting" => Some(&[4, 8]),
        "understanding" => Some(&[2, 5, 10]),
        _ => None,
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_entries() {
        let dict = DictionaryHyphenator::from_entries(["un-der-stand-ing", "Hy-phen"]);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.break_points("understanding", "en"), vec![2, 5, 10]);
        assert_eq!(dict.break_points("Understanding", ""), vec![2, 5, 10]);
        assert_eq!(dict.break_points("hyphen", "de"), vec![2]);
        assert!(dict.break_points("standing", "en").is_empty());
    }

    #[test]
    fn test_dictionary_ignores_edge_hyphens() {
        let dict = DictionaryHyphenator::from_entries(["-ab--cd-"]);
        assert_eq!(dict.break_points("abcd", ""), vec![2]);
    }

    #[test]
    fn test_english_short_words_untouched() {
        assert!(EnglishHyphenator.break_points("simple", "en").is_empty());
        assert!(EnglishHyphenator.break_points("don't-stop", "en").is_empty());
    }

    #[test]
    fn test_english_respects_language() {
        assert!(!EnglishHyphenator.break_points("wonderful", "en-GB").is_empty());
        assert!(!EnglishHyphenator.break_points("wonderful", "").is_empty());
        assert!(EnglishHyphenator.break_points("wonderful", "de").is_empty());
    }

    #[test]
    fn test_english_points_keep_three_letters() {
        let word = "remarkable";
        let points = EnglishHyphenator.break_points(word, "en");
        assert!(!points.is_empty());
        assert!(points.iter().all(|&p| p >= 3 && p <= word.len() - 3));
        assert!(points.windows(2).all(|w| w[0] < w[1]));
        // "-able" suffix.
        assert!(points.contains(&6));
    }

    #[test]
    fn test_english_exceptions() {
        assert_eq!(EnglishHyphenator.break_points("Typesetting", "en"), vec![4, 8]);
    }
}
