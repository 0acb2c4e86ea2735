// Analyzer registry
// Closed dispatch from Dimension to its analyzer

use super::{
    burstiness, lexical_richness, ngram_repetition, perplexity, readability, semantic_coherence,
    stylistic_markers, AnalyzerFailure, DimensionScore,
};
use crate::models::Dimension;
use crate::services::config_store::ScoringBands;
use crate::services::providers::ScoringPrimitives;
use crate::services::segmenter::Document;

/// Run one dimension's analyzer. Only the model-backed dimensions can fail.
pub async fn analyze_dimension(
    dimension: Dimension,
    doc: &Document,
    bands: &ScoringBands,
    primitives: &ScoringPrimitives,
) -> Result<DimensionScore, AnalyzerFailure> {
    let result = match dimension {
        Dimension::Perplexity => {
            perplexity::analyze(doc, &bands.perplexity, primitives.language_model.as_ref()).await?
        }
        Dimension::Burstiness => burstiness::analyze(doc, &bands.burstiness),
        Dimension::SemanticCoherence => {
            semantic_coherence::analyze(doc, &bands.semantic, primitives.embedder.as_ref()).await?
        }
        Dimension::NgramRepetition => ngram_repetition::analyze(doc, &bands.ngram),
        Dimension::LexicalRichness => lexical_richness::analyze(doc, &bands.lexical),
        Dimension::StylisticMarkers => stylistic_markers::analyze(doc, bands.stylistic_scale),
        Dimension::Readability => readability::analyze(doc, &bands.readability),
    };
    Ok(result)
}
