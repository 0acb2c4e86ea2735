// Semantic coherence analyzer
// Embedding similarity between adjacent paragraphs only

use super::evidence::paragraph_pair_evidence;
use super::stats::{cosine_similarity, linear_score, mean};
use super::DimensionScore;
use crate::services::config_store::LinearBand;
use crate::services::providers::{Embedder, ProviderError};
use crate::services::segmenter::Document;
use tracing::debug;

fn describe(similarity: f64) -> &'static str {
    if similarity < 0.2 {
        "abrupt topic shift"
    } else if similarity < 0.5 {
        "loose connection"
    } else {
        "closely related"
    }
}

/// Mean cosine over adjacent pairs, mapped through `band`.
/// Documents with a single paragraph get the neutral score without any embedding calls.
pub async fn analyze(
    doc: &Document,
    band: &LinearBand,
    embedder: &dyn Embedder,
) -> Result<DimensionScore, ProviderError> {
    let paragraphs = doc.paragraphs();
    if paragraphs.len() < 2 {
        return Ok(DimensionScore::neutral());
    }

    let mut embeddings = Vec::with_capacity(paragraphs.len());
    for paragraph in paragraphs {
        embeddings.push(embedder.embed(doc.slice(paragraph.span)).await?);
    }

    let mut similarities = Vec::with_capacity(paragraphs.len() - 1);
    let mut evidences = Vec::with_capacity(paragraphs.len() - 1);
    for (i, pair) in paragraphs.windows(2).enumerate() {
        let similarity = cosine_similarity(&embeddings[i], &embeddings[i + 1])?;
        similarities.push(similarity);
        evidences.push(paragraph_pair_evidence(
            doc,
            &pair[0],
            &pair[1],
            similarity,
            1.0 - linear_score(similarity, band),
            format!(
                "Paragraphs {} and {} similarity {:.2} ({})",
                pair[0].index + 1,
                pair[1].index + 1,
                similarity,
                describe(similarity)
            ),
        ));
    }

    debug!(pairs = similarities.len(), embedder = embedder.name(), "[COHERENCE] scored");
    let score = mean(&similarities)
        .map(|m| linear_score(m, band))
        .unwrap_or(super::NEUTRAL_SCORE);
    Ok(DimensionScore::new(score, evidences))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EvidencePayload;
    use crate::services::providers::HashingEmbedder;
    use crate::services::segmenter::TextSegmenter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 0.0])
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    /// Returns vectors of different lengths on alternate calls.
    struct RaggedEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for RaggedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0; 2 + n])
        }

        fn name(&self) -> &str {
            "ragged"
        }
    }

    fn band() -> LinearBand {
        LinearBand { low: 0.0, high: 1.0 }
    }

    #[tokio::test]
    async fn test_single_paragraph_is_neutral_without_calls() {
        let doc = TextSegmenter::default().segment("Short AI test.").unwrap();
        let embedder = CountingEmbedder { calls: AtomicUsize::new(0) };
        let result = analyze(&doc, &band(), &embedder).await.unwrap();
        assert_eq!(result.score, 0.5);
        assert!(result.evidences.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_identical_paragraphs_are_fully_coherent() {
        let doc = TextSegmenter::default()
            .segment("First block of text.\n\nSecond block of text.\n\nThird block.")
            .unwrap();
        let embedder = CountingEmbedder { calls: AtomicUsize::new(0) };
        let result = analyze(&doc, &band(), &embedder).await.unwrap();
        assert!((result.score - 1.0).abs() < 1e-12);
        assert_eq!(result.evidences.len(), 2);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result.evidences[1].payload,
            EvidencePayload::ParagraphPair { first: 1, second: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_pair_span_covers_both_paragraphs() {
        let text = "Cats purr softly at night.\n\nQuantum fields fluctuate constantly.";
        let doc = TextSegmenter::default().segment(text).unwrap();
        let result = analyze(&doc, &band(), &HashingEmbedder::default()).await.unwrap();
        let ev = &result.evidences[0];
        assert_eq!(ev.start_index, 0);
        assert_eq!(ev.end_index, text.chars().count());
        assert!(ev.severity >= 0.5);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_an_error() {
        let doc = TextSegmenter::default().segment("Alpha text here.\n\nBeta text here.").unwrap();
        let embedder = RaggedEmbedder { calls: AtomicUsize::new(0) };
        let err = analyze(&doc, &band(), &embedder).await.unwrap_err();
        assert!(matches!(err, ProviderError::DimensionMismatch { .. }));
    }
}
