// Burstiness analyzer
// Coefficient of variation of sentence token lengths within each paragraph

use super::evidence::paragraph_evidence;
use super::stats::{coefficient_of_variation, mean, v_band_score};
use super::{DimensionScore, NEUTRAL_SCORE};
use crate::services::config_store::NaturalBand;
use crate::services::segmenter::Document;

fn describe(cv: f64, band: &NaturalBand) -> &'static str {
    if cv < band.low {
        "too uniform"
    } else if cv > band.high {
        "unusually erratic"
    } else {
        "natural variation"
    }
}

/// Paragraphs with fewer than two worded sentences carry no CV and are skipped.
pub fn analyze(doc: &Document, band: &NaturalBand) -> DimensionScore {
    let mut cvs = Vec::new();
    let mut evidences = Vec::new();

    for paragraph in doc.paragraphs() {
        let lengths: Vec<f64> = paragraph
            .sentences
            .iter()
            .filter(|s| s.token_count() > 0)
            .map(|s| s.token_count() as f64)
            .collect();
        let Some(cv) = coefficient_of_variation(&lengths) else {
            continue;
        };
        let mu = mean(&lengths).unwrap_or(0.0);

        cvs.push(cv);
        evidences.push(paragraph_evidence(
            doc,
            paragraph,
            v_band_score(cv, band),
            format!(
                "Sentence length CV {:.2} across {} sentences, mean {:.1} tokens ({})",
                cv,
                lengths.len(),
                mu,
                describe(cv, band)
            ),
        ));
    }

    let score = mean(&cvs)
        .map(|m| v_band_score(m, band))
        .unwrap_or(NEUTRAL_SCORE);
    DimensionScore::new(score, evidences)
}
