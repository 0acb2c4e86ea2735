// Lexical richness analyzer
// Case-insensitive type-token ratio per sentence

use super::evidence::sentence_evidence;
use super::stats::{linear_score, mean};
use super::{DimensionScore, NEUTRAL_SCORE};
use crate::services::config_store::LinearBand;
use crate::services::segmenter::{Document, Sentence};
use std::collections::HashSet;

/// `None` for sentences without tokens.
pub fn sentence_ttr(sentence: &Sentence) -> Option<f64> {
    if sentence.tokens.is_empty() {
        return None;
    }
    let unique: HashSet<&str> = sentence.tokens.iter().map(|t| t.lower.as_str()).collect();
    Some(unique.len() as f64 / sentence.tokens.len() as f64)
}

/// Sentence TTR -> paragraph mean -> document mean, inverted so low richness scores high.
pub fn analyze(doc: &Document, band: &LinearBand) -> DimensionScore {
    let mut paragraph_ttrs = Vec::new();
    let mut evidences = Vec::new();

    for paragraph in doc.paragraphs() {
        let mut ttrs = Vec::with_capacity(paragraph.sentences.len());
        for sentence in &paragraph.sentences {
            let Some(ttr) = sentence_ttr(sentence) else {
                continue;
            };
            ttrs.push(ttr);
            evidences.push(sentence_evidence(
                doc,
                sentence,
                1.0 - linear_score(ttr, band),
                format!(
                    "Type-token ratio {:.2} over {} tokens",
                    ttr,
                    sentence.token_count()
                ),
            ));
        }
        if let Some(m) = mean(&ttrs) {
            paragraph_ttrs.push(m);
        }
    }

    let score = mean(&paragraph_ttrs)
        .map(|m| 1.0 - linear_score(m, band))
        .unwrap_or(NEUTRAL_SCORE);
    DimensionScore::new(score, evidences)
}
