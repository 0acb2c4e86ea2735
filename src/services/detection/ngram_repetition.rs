// N-gram repetition analyzer
// Whole-document repetition and entropy over 2/3/4-grams

use super::stats::{mean, normalized_entropy, safe_ratio};
use super::{DimensionScore, NEUTRAL_SCORE};
use crate::models::{Evidence, EvidencePayload};
use crate::services::config_store::NgramSettings;
use crate::services::segmenter::{Document, Span};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
struct GramStats {
    count: usize,
    first: Span,
}

/// Counts of every n-gram formed inside sentence boundaries.
fn count_ngrams(doc: &Document, n: usize) -> (BTreeMap<String, GramStats>, usize) {
    let mut counts: BTreeMap<String, GramStats> = BTreeMap::new();
    let mut total = 0usize;
    for sentence in doc.sentences() {
        if sentence.tokens.len() < n {
            continue;
        }
        for window in sentence.tokens.windows(n) {
            let key = window
                .iter()
                .map(|t| t.lower.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let span = Span::new(window[0].span.start, window[n - 1].span.end);
            counts
                .entry(key)
                .and_modify(|g| g.count += 1)
                .or_insert(GramStats { count: 1, first: span });
            total += 1;
        }
    }
    (counts, total)
}

/// Share of n-gram occurrences that repeat an earlier one.
fn repeat_rate(counts: &BTreeMap<String, GramStats>, total: usize) -> f64 {
    let repeats: usize = counts.values().map(|g| g.count.saturating_sub(1)).sum();
    safe_ratio(repeats, total)
}

/// Grows with both repetition count and gram length.
fn severity(count: usize, n: usize) -> f64 {
    1.0 - (-((count - 1) as f64) * n as f64 / 4.0).exp()
}

/// `s_n = w * repeat_rate + (1 - w) * (1 - normalized_entropy)`, averaged over sizes.
/// Documents shorter than `min_tokens` get the neutral score.
pub fn analyze(doc: &Document, settings: &NgramSettings) -> DimensionScore {
    if doc.token_count() < settings.min_tokens {
        return DimensionScore::neutral();
    }

    let w = settings.repetition_weight;
    let mut per_size = Vec::with_capacity(settings.sizes.len());
    let mut evidences = Vec::new();

    for &n in &settings.sizes {
        if n == 0 {
            continue;
        }
        let (counts, total) = count_ngrams(doc, n);
        if total < 2 {
            continue;
        }

        let rep = repeat_rate(&counts, total);
        let h = normalized_entropy(counts.values().map(|g| g.count), total);
        per_size.push(w * rep + (1.0 - w) * (1.0 - h));

        for (gram, stats) in counts.iter().filter(|(_, g)| g.count >= 2) {
            let (start, end) = doc.char_span(stats.first);
            evidences.push(Evidence::new(
                doc.slice(stats.first),
                severity(stats.count, n),
                start,
                end,
                format!("{}-gram \"{}\" repeated {} times", n, gram, stats.count),
                EvidencePayload::Ngram {
                    n,
                    count: stats.count,
                    gram: gram.clone(),
                },
            ));
        }
    }

    let score = mean(&per_size).unwrap_or(NEUTRAL_SCORE);
    DimensionScore::new(score, evidences)
}
