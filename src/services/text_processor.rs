// Text Processing Service
// Lexical helpers shared by the segmenter and the dimension analyzers

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Word-like unit: letters/digits with inner apostrophes or hyphens ("don't", "well-known").
fn token_re() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| {
        Regex::new(r"[\p{L}\p{N}]+(?:['\u{2019}\-][\p{L}\p{N}]+)*").expect("valid token regex")
    })
}

fn whitespace_re() -> &'static Regex {
    static WS_RE: OnceLock<Regex> = OnceLock::new();
    WS_RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Byte spans of every token in `text`, relative to `text`.
pub fn token_spans(text: &str) -> Vec<(usize, usize)> {
    token_re()
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// Case-folded key used by every case-insensitive metric.
pub fn fold_case(token: &str) -> String {
    token.to_lowercase().replace('\u{2019}', "'")
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    whitespace_re().replace_all(text.trim(), " ").to_string()
}

/// First `max_chars` characters with an ellipsis when truncated.
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = collapse_whitespace(text);
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let head: String = collapsed.chars().take(max_chars).collect();
    format!("{}...", head.trim_end())
}

/// Vowel-group syllable estimate with a silent-e rule; never below 1.
pub fn count_syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(|c| c.to_lowercase())
        .collect();
    if letters.is_empty() {
        return 1;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0usize;
    let mut prev_vowel = false;
    for &c in &letters {
        let v = is_vowel(c);
        if v && !prev_vowel {
            count += 1;
        }
        prev_vowel = v;
    }

    let n = letters.len();
    if n > 2 && letters[n - 1] == 'e' && letters[n - 2] != 'l' && !is_vowel(letters[n - 2]) && count > 1 {
        count -= 1;
    }

    count.max(1)
}

const FUNCTION_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "between", "both", "but", "by", "can",
    "could", "did", "do", "does", "each", "for", "from", "had", "has", "have", "he", "her", "here",
    "him", "his", "how", "i", "if", "in", "into", "is", "it", "its", "may", "me", "might", "more",
    "most", "must", "my", "no", "nor", "not", "of", "on", "or", "other", "our", "shall", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "to", "under", "until", "up", "us", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
    "with", "would", "you", "your",
];

fn function_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| FUNCTION_WORDS.iter().copied().collect())
}

/// `lower` must already be case-folded.
pub fn is_function_word(lower: &str) -> bool {
    function_words().contains(lower)
}

/// Punctuation classes tracked by the stylistic profile.
pub const PUNCTUATION_CLASSES: usize = 8;

fn punctuation_class(ch: char) -> Option<usize> {
    match ch {
        ',' | '\u{ff0c}' => Some(0),
        ';' | '\u{ff1b}' => Some(1),
        ':' | '\u{ff1a}' => Some(2),
        '-' | '\u{2013}' | '\u{2014}' => Some(3),
        '(' | ')' | '[' | ']' => Some(4),
        '"' | '\'' | '\u{201c}' | '\u{201d}' | '\u{2018}' | '\u{2019}' => Some(5),
        '!' | '\u{ff01}' => Some(6),
        '?' | '\u{ff1f}' => Some(7),
        _ => None,
    }
}

/// Counts per punctuation class. Apostrophes inside tokens are counted too;
/// callers normalise by token count so the effect is uniform.
pub fn punctuation_profile(text: &str) -> [usize; PUNCTUATION_CLASSES] {
    let mut counts = [0usize; PUNCTUATION_CLASSES];
    for ch in text.chars() {
        if let Some(idx) = punctuation_class(ch) {
            counts[idx] += 1;
        }
    }
    counts
}
