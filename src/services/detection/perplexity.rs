// Perplexity analyzer
// Sentence predictability under the injected language model

use super::evidence::sentence_evidence;
use super::stats::{linear_score, mean};
use super::{DimensionScore, NEUTRAL_SCORE};
use crate::services::config_store::LinearBand;
use crate::services::providers::{LanguageModel, ProviderError};
use crate::services::segmenter::Document;
use tracing::debug;

/// `exp(-mean log p)`; `None` when there is nothing usable to average.
pub fn sentence_perplexity(log_probs: &[f64]) -> Option<f64> {
    let avg = mean(log_probs)?;
    if avg.is_nan() {
        return None;
    }
    Some((-avg).exp())
}

fn describe(score: f64) -> &'static str {
    if score >= 0.7 {
        "highly predictable"
    } else if score >= 0.4 {
        "moderately predictable"
    } else {
        "natural variation"
    }
}

/// Sentence score = inverted linear map of perplexity; paragraph = max; global = mean.
pub async fn analyze(
    doc: &Document,
    band: &LinearBand,
    lm: &dyn LanguageModel,
) -> Result<DimensionScore, ProviderError> {
    let mut paragraph_scores = Vec::with_capacity(doc.paragraph_count());
    let mut evidences = Vec::with_capacity(doc.sentence_count());

    for paragraph in doc.paragraphs() {
        let mut best: Option<f64> = None;
        for sentence in &paragraph.sentences {
            if sentence.token_count() == 0 {
                continue;
            }
            let tokens: Vec<String> = sentence.tokens.iter().map(|t| t.text.clone()).collect();
            let log_probs = lm.sequence_log_probs(&tokens).await?;
            let Some(ppl) = sentence_perplexity(&log_probs) else {
                continue;
            };

            let score = 1.0 - linear_score(ppl, band);
            best = Some(best.map_or(score, |b| b.max(score)));
            evidences.push(sentence_evidence(
                doc,
                sentence,
                score,
                format!("Sentence perplexity {:.1} ({})", ppl, describe(score)),
            ));
        }
        if let Some(b) = best {
            paragraph_scores.push(b);
        }
    }

    debug!(
        paragraphs = paragraph_scores.len(),
        sentences = evidences.len(),
        model = lm.name(),
        "[PERPLEXITY] scored"
    );
    let score = mean(&paragraph_scores).unwrap_or(NEUTRAL_SCORE);
    Ok(DimensionScore::new(score, evidences))
}
