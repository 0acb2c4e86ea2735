// Text Segmenter
// Splits raw text into the paragraph / sentence / token hierarchy shared by all analyzers

use crate::services::detection::AnalysisError;
use crate::services::text_processor::{fold_case, token_spans};
use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_MIN_CHARS: usize = 10;

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "vs", "etc", "e.g", "i.e", "fig", "eq", "inc",
    "ltd", "dept", "approx",
];

fn paragraph_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid paragraph regex"))
}

/// Byte range into the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    /// Case-folded form used by case-insensitive metrics.
    pub lower: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Sentence {
    /// Position within the owning paragraph.
    pub index: usize,
    pub paragraph_index: usize,
    pub span: Span,
    pub tokens: Vec<Token>,
}

impl Sentence {
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

#[derive(Debug, Clone)]
pub struct Paragraph {
    pub index: usize,
    pub span: Span,
    pub sentences: Vec<Sentence>,
}

impl Paragraph {
    pub fn token_count(&self) -> usize {
        self.sentences.iter().map(Sentence::token_count).sum()
    }
}

/// Immutable segmentation of one request's text.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    paragraphs: Vec<Paragraph>,
    char_starts: Vec<usize>,
    token_count: usize,
    sentence_count: usize,
}

impl Document {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn sentences(&self) -> impl Iterator<Item = &Sentence> {
        self.paragraphs.iter().flat_map(|p| p.sentences.iter())
    }

    pub fn slice(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or("")
    }

    pub fn char_len(&self) -> usize {
        self.char_starts.len()
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn sentence_count(&self) -> usize {
        self.sentence_count
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    /// Char offset of a byte position (positions inside a char round up).
    pub fn char_offset(&self, byte: usize) -> usize {
        self.char_starts.partition_point(|&b| b < byte)
    }

    pub fn char_span(&self, span: Span) -> (usize, usize) {
        (self.char_offset(span.start), self.char_offset(span.end))
    }
}

#[derive(Debug, Clone)]
pub struct TextSegmenter {
    min_chars: usize,
}

impl Default for TextSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CHARS)
    }
}

impl TextSegmenter {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn segment(&self, raw: &str) -> Result<Document, AnalysisError> {
        let actual = raw.trim().chars().count();
        if actual < self.min_chars {
            return Err(AnalysisError::EmptyText {
                min_chars: self.min_chars,
                actual,
            });
        }

        let mut paragraphs = Vec::new();
        for span in paragraph_spans(raw) {
            let index = paragraphs.len();
            let sentences = sentence_spans(raw, span)
                .into_iter()
                .enumerate()
                .map(|(i, s)| Sentence {
                    index: i,
                    paragraph_index: index,
                    span: s,
                    tokens: tokens_in(raw, s),
                })
                .collect::<Vec<_>>();
            paragraphs.push(Paragraph {
                index,
                span,
                sentences,
            });
        }

        let sentence_count: usize = paragraphs.iter().map(|p| p.sentences.len()).sum();
        let token_count: usize = paragraphs.iter().map(Paragraph::token_count).sum();
        if paragraphs.is_empty() || sentence_count == 0 {
            return Err(AnalysisError::Segmentation(
                "text produced no paragraphs or sentences".to_string(),
            ));
        }
        if token_count == 0 {
            return Err(AnalysisError::Segmentation(
                "text contains no word tokens".to_string(),
            ));
        }

        Ok(Document {
            text: raw.to_string(),
            paragraphs,
            char_starts: raw.char_indices().map(|(b, _)| b).collect(),
            token_count,
            sentence_count,
        })
    }
}

/// Paragraphs are separated by blank lines (whitespace-only lines count as blank).
fn paragraph_spans(text: &str) -> Vec<Span> {
    let mut raw_bounds = Vec::new();
    let mut last = 0;
    for m in paragraph_break_re().find_iter(text) {
        raw_bounds.push((last, m.start()));
        last = m.end();
    }
    raw_bounds.push((last, text.len()));

    raw_bounds
        .into_iter()
        .filter_map(|(s, e)| trimmed_span(text, s, e))
        .collect()
}

fn trimmed_span(text: &str, start: usize, end: usize) -> Option<Span> {
    let raw = &text[start..end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lead = raw.len() - raw.trim_start().len();
    Some(Span::new(start + lead, start + lead + trimmed.len()))
}

fn is_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?' | '\u{2026}' | '\u{3002}' | '\u{ff01}' | '\u{ff1f}')
}

fn is_cjk_terminator(ch: char) -> bool {
    matches!(ch, '\u{3002}' | '\u{ff01}' | '\u{ff1f}')
}

fn is_closer(ch: char) -> bool {
    matches!(ch, '"' | '\'' | '\u{201d}' | '\u{2019}' | ')' | ']')
}

/// Start index of the word immediately before position `i`, allowing inner dots ("e.g").
fn word_start(chars: &[(usize, char)], i: usize) -> usize {
    let mut j = i;
    while j > 0 && (chars[j - 1].1.is_alphabetic() || chars[j - 1].1 == '.') {
        j -= 1;
    }
    j
}

/// First non-whitespace char after position `i`, with its index.
fn next_visible(chars: &[(usize, char)], i: usize) -> Option<(usize, char)> {
    (i + 1..chars.len())
        .map(|k| (k, chars[k].1))
        .find(|&(_, c)| !c.is_whitespace())
}

fn next_is_capitalised(chars: &[(usize, char)], i: usize) -> bool {
    next_visible(chars, i).is_some_and(|(_, c)| c.is_uppercase())
}

/// "X." followed by another initial, as in "J. R. Tolkien".
fn next_is_initial(chars: &[(usize, char)], i: usize) -> bool {
    match next_visible(chars, i) {
        Some((k, c)) if c.is_uppercase() => {
            chars.get(k + 1).is_some_and(|&(_, d)| d == '.')
                && chars.get(k + 2).map_or(true, |&(_, d)| !d.is_alphabetic())
        }
        _ => false,
    }
}

/// The word before `letter` is capitalised, or there is none in this sentence.
fn capitalised_context(chars: &[(usize, char)], letter: usize) -> bool {
    let mut k = letter;
    while k > 0 && chars[k - 1].1.is_whitespace() {
        k -= 1;
    }
    if k == 0 || is_terminator(chars[k - 1].1) {
        return true;
    }
    let start = word_start(chars, k);
    chars[start..k]
        .iter()
        .find(|(_, c)| c.is_alphabetic())
        .is_some_and(|&(_, c)| c.is_uppercase())
}

/// Whether the period at `i` closes an abbreviation or initial rather than a sentence.
fn is_abbreviation(chars: &[(usize, char)], i: usize) -> bool {
    let start = word_start(chars, i);
    let word: String = chars[start..i].iter().map(|&(_, c)| c).collect();
    let trimmed = word.trim_start_matches('.');
    if trimmed.is_empty() {
        return false;
    }
    let lower = trimmed.to_lowercase();
    if ABBREVIATIONS.contains(&lower.as_str()) {
        return true;
    }

    let first_upper = trimmed.chars().next().is_some_and(char::is_uppercase);
    match lower.as_str() {
        // "No. 5", not "she said no."
        "no" => next_visible(chars, i).is_some_and(|(_, c)| c.is_ascii_digit()),
        // "St. Louis", "Acme Co. Ltd"
        "st" | "co" => first_upper && next_is_capitalised(chars, i),
        _ if trimmed.chars().count() == 1 && first_upper => {
            let letter = i - 1;
            let standalone = letter == 0 || chars[letter - 1].1.is_whitespace();
            standalone
                && (next_is_initial(chars, i)
                    || (capitalised_context(chars, letter) && next_is_capitalised(chars, i)))
        }
        _ => false,
    }
}

/// Sentence spans inside one paragraph. Never yields an empty span.
fn sentence_spans(text: &str, para: Span) -> Vec<Span> {
    let body = &text[para.start..para.end];
    let chars: Vec<(usize, char)> = body.char_indices().collect();
    let n = chars.len();
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i < n {
        let (byte, ch) = chars[i];
        if start.is_none() {
            if ch.is_whitespace() {
                i += 1;
                continue;
            }
            start = Some(byte);
        }

        if !is_terminator(ch) {
            i += 1;
            continue;
        }

        if ch == '.' {
            let decimal = i > 0
                && i + 1 < n
                && chars[i - 1].1.is_ascii_digit()
                && chars[i + 1].1.is_ascii_digit();
            if decimal || is_abbreviation(&chars, i) {
                i += 1;
                continue;
            }
        }

        let mut j = i + 1;
        while j < n && (is_terminator(chars[j].1) || is_closer(chars[j].1)) {
            j += 1;
        }
        if j < n && !chars[j].1.is_whitespace() && !is_cjk_terminator(ch) {
            i = j;
            continue;
        }

        let end = if j < n { chars[j].0 } else { body.len() };
        if let Some(s) = start.take() {
            spans.push(Span::new(para.start + s, para.start + end));
        }
        i = j;
    }

    if let Some(s) = start {
        let rest = body[s..].trim_end();
        if !rest.is_empty() {
            spans.push(Span::new(para.start + s, para.start + s + rest.len()));
        }
    }

    if spans.is_empty() {
        spans.push(para);
    }
    spans
}

fn tokens_in(text: &str, sentence: Span) -> Vec<Token> {
    let body = &text[sentence.start..sentence.end];
    token_spans(body)
        .into_iter()
        .map(|(s, e)| {
            let t = &body[s..e];
            Token {
                text: t.to_string(),
                lower: fold_case(t),
                span: Span::new(sentence.start + s, sentence.start + e),
            }
        })
        .collect()
}
