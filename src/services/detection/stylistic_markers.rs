// Stylistic markers analyzer
// Spread of per-sentence punctuation and function-word profiles inside each paragraph

use super::evidence::sentence_evidence;
use super::stats::{mean, saturate};
use super::{DimensionScore, NEUTRAL_SCORE};
use crate::services::segmenter::{Document, Sentence};
use crate::services::text_processor::{is_function_word, punctuation_profile, PUNCTUATION_CLASSES};

pub const PROFILE_LEN: usize = PUNCTUATION_CLASSES + 1;

/// Per-token punctuation class frequencies followed by the function-word ratio.
pub fn sentence_profile(doc: &Document, sentence: &Sentence) -> Option<[f64; PROFILE_LEN]> {
    let tokens = sentence.token_count();
    if tokens == 0 {
        return None;
    }
    let n = tokens as f64;
    let mut profile = [0.0; PROFILE_LEN];
    for (slot, count) in profile.iter_mut().zip(punctuation_profile(doc.slice(sentence.span))) {
        *slot = count as f64 / n;
    }
    let function_words = sentence.tokens.iter().filter(|t| is_function_word(&t.lower)).count();
    profile[PUNCTUATION_CLASSES] = function_words as f64 / n;
    Some(profile)
}

fn squared_distance(a: &[f64; PROFILE_LEN], b: &[f64; PROFILE_LEN]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Paragraph variance = mean squared distance to the paragraph centroid,
/// saturated by `scale`. Paragraphs with fewer than two worded sentences are skipped.
pub fn analyze(doc: &Document, scale: f64) -> DimensionScore {
    let mut paragraph_scores = Vec::new();
    let mut evidences = Vec::new();

    for paragraph in doc.paragraphs() {
        let profiles: Vec<(&Sentence, [f64; PROFILE_LEN])> = paragraph
            .sentences
            .iter()
            .filter_map(|s| sentence_profile(doc, s).map(|p| (s, p)))
            .collect();
        if profiles.len() < 2 {
            continue;
        }

        let count = profiles.len() as f64;
        let mut centroid = [0.0; PROFILE_LEN];
        for (_, p) in &profiles {
            for (c, v) in centroid.iter_mut().zip(p) {
                *c += v / count;
            }
        }

        let distances: Vec<f64> = profiles
            .iter()
            .map(|(_, p)| squared_distance(p, &centroid))
            .collect();
        let variance = mean(&distances).unwrap_or(0.0);
        paragraph_scores.push(saturate(variance, scale));

        for ((sentence, profile), distance) in profiles.iter().zip(&distances) {
            evidences.push(sentence_evidence(
                doc,
                sentence,
                saturate(*distance, scale),
                format!(
                    "Style deviates from paragraph profile by {:.3} (function words {:.0}%)",
                    distance,
                    profile[PUNCTUATION_CLASSES] * 100.0
                ),
            ));
        }
    }

    let score = mean(&paragraph_scores).unwrap_or(NEUTRAL_SCORE);
    DimensionScore::new(score, evidences)
}
