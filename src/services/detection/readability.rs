// Readability analyzer
// Flesch Reading Ease per sentence, folded around an ideal band

use super::evidence::sentence_evidence;
use super::stats::{mean, v_band_score};
use super::{DimensionScore, NEUTRAL_SCORE};
use crate::services::config_store::NaturalBand;
use crate::services::segmenter::{Document, Sentence};
use crate::services::text_processor::count_syllables;

/// `206.835 - 1.015 * words/sentences - 84.6 * syllables/words`
pub fn flesch_reading_ease(words: usize, sentences: usize, syllables: usize) -> f64 {
    if words == 0 || sentences == 0 {
        return 0.0;
    }
    let asl = words as f64 / sentences as f64;
    let asw = syllables as f64 / words as f64;
    206.835 - 1.015 * asl - 84.6 * asw
}

pub fn sentence_flesch(sentence: &Sentence) -> Option<f64> {
    if sentence.tokens.is_empty() {
        return None;
    }
    let syllables = sentence.tokens.iter().map(|t| count_syllables(&t.text)).sum();
    Some(flesch_reading_ease(sentence.tokens.len(), 1, syllables))
}

pub fn level_label(score: f64) -> &'static str {
    if score >= 90.0 {
        "Very Easy"
    } else if score >= 80.0 {
        "Easy"
    } else if score >= 70.0 {
        "Fairly Easy"
    } else if score >= 60.0 {
        "Standard"
    } else if score >= 50.0 {
        "Fairly Difficult"
    } else if score >= 30.0 {
        "Difficult"
    } else {
        "Very Difficult"
    }
}

/// Sentence Flesch -> paragraph mean -> document mean -> V-band around the ideal range.
pub fn analyze(doc: &Document, band: &NaturalBand) -> DimensionScore {
    let mut paragraph_means = Vec::new();
    let mut evidences = Vec::new();

    for paragraph in doc.paragraphs() {
        let mut scores = Vec::with_capacity(paragraph.sentences.len());
        for sentence in &paragraph.sentences {
            let Some(fre) = sentence_flesch(sentence) else {
                continue;
            };
            scores.push(fre);
            evidences.push(sentence_evidence(
                doc,
                sentence,
                v_band_score(fre, band),
                format!("Flesch reading ease {:.1} ({})", fre, level_label(fre)),
            ));
        }
        if let Some(m) = mean(&scores) {
            paragraph_means.push(m);
        }
    }

    let score = mean(&paragraph_means)
        .map(|m| v_band_score(m, band))
        .unwrap_or(NEUTRAL_SCORE);
    DimensionScore::new(score, evidences)
}
