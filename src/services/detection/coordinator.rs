// Analysis Coordinator
// Segments once, fans the enabled analyzers out in parallel under one deadline,
// then folds successes and failures into a single AnalysisResult

use super::evidence::EvidenceRanker;
use super::registry::analyze_dimension;
use super::stats::{clamp_unit, round_f64};
use super::weights::WeightResolver;
use super::{AnalysisError, AnalyzerFailure, DimensionScore};
use crate::models::{
    AnalysisMetadata, AnalysisResult, Dimension, DimensionResult, WeightTable,
};
use crate::services::config_store::{AnalysisConfig, ScoringBands};
use crate::services::providers::ScoringPrimitives;
use crate::services::segmenter::{Document, TextSegmenter};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

type Outcomes = BTreeMap<Dimension, Result<DimensionScore, AnalyzerFailure>>;

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub min_text_chars: usize,
    /// Overall deadline for the analyzer phase of one request.
    pub deadline: Duration,
    pub max_concurrency: usize,
    pub top_evidence_limit: usize,
    pub bands: Arc<ScoringBands>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl AnalysisOptions {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            min_text_chars: config.min_text_chars,
            deadline: Duration::from_millis(config.deadline_ms),
            max_concurrency: config.max_concurrency.max(1),
            top_evidence_limit: config.top_evidence_limit,
            bands: Arc::new(config.bands.clone()),
        }
    }
}

pub struct AnalysisCoordinator {
    primitives: ScoringPrimitives,
    options: AnalysisOptions,
}

impl AnalysisCoordinator {
    pub fn new(primitives: ScoringPrimitives, options: AnalysisOptions) -> Self {
        Self { primitives, options }
    }

    /// Analyze `raw_text` over `enabled` dimensions.
    ///
    /// Dropping the returned future cancels every in-flight analyzer task.
    pub async fn run(
        &self,
        raw_text: &str,
        enabled: &BTreeSet<Dimension>,
        base_weights: &WeightTable,
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        if enabled.is_empty() {
            return Err(AnalysisError::NoActiveDimensions);
        }

        let doc = Arc::new(TextSegmenter::new(self.options.min_text_chars).segment(raw_text)?);
        info!(
            "[COORDINATOR] segmented: {} paragraphs, {} sentences, {} tokens; dispatching {} dimensions",
            doc.paragraph_count(),
            doc.sentence_count(),
            doc.token_count(),
            enabled.len()
        );

        let outcomes = self
            .dispatch(doc.clone(), enabled, started + self.options.deadline)
            .await;
        let result = self.assemble(&doc, enabled, base_weights, outcomes, started)?;

        info!(
            "[COORDINATOR] done: overall={:.4} active={}/{} elapsed={}ms",
            result.overall_score,
            result.active_dimensions.len(),
            enabled.len(),
            result.analysis_metadata.processing_time_ms
        );
        Ok(result)
    }

    fn concurrency(&self, enabled: usize) -> usize {
        self.options.max_concurrency.min(enabled).max(1)
    }

    async fn dispatch(
        &self,
        doc: Arc<Document>,
        enabled: &BTreeSet<Dimension>,
        deadline: Instant,
    ) -> Outcomes {
        let semaphore = Arc::new(Semaphore::new(self.concurrency(enabled.len())));
        let mut join_set: JoinSet<(Dimension, Result<DimensionScore, AnalyzerFailure>)> =
            JoinSet::new();

        for &dimension in enabled {
            let doc = doc.clone();
            let bands = self.options.bands.clone();
            let primitives = self.primitives.clone();
            let semaphore = semaphore.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let task_start = Instant::now();
                let outcome = analyze_dimension(dimension, &doc, &bands, &primitives).await;
                debug!(
                    dimension = %dimension,
                    elapsed_ms = task_start.elapsed().as_millis() as u64,
                    ok = outcome.is_ok(),
                    "analyzer.finished"
                );
                (dimension, outcome)
            });
        }

        let mut pending: BTreeSet<Dimension> = enabled.clone();
        let mut outcomes = Outcomes::new();

        loop {
            match tokio::time::timeout_at(deadline, join_set.join_next()).await {
                Ok(Some(Ok((dimension, outcome)))) => {
                    pending.remove(&dimension);
                    outcomes.insert(dimension, outcome);
                }
                Ok(Some(Err(e))) => {
                    warn!("[COORDINATOR] analyzer task failed: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    let deadline_ms = self.options.deadline.as_millis() as u64;
                    warn!(
                        "[COORDINATOR] deadline of {}ms reached with {} analyzers running",
                        deadline_ms,
                        pending.len()
                    );
                    join_set.abort_all();
                    for dimension in std::mem::take(&mut pending) {
                        outcomes.insert(dimension, Err(AnalyzerFailure::Timeout(deadline_ms)));
                    }
                    break;
                }
            }
        }

        // Tasks that panicked or were cancelled never reported back
        for dimension in pending {
            outcomes.insert(
                dimension,
                Err(AnalyzerFailure::Aborted("analyzer task did not complete".to_string())),
            );
        }
        outcomes
    }

    fn assemble(
        &self,
        doc: &Document,
        enabled: &BTreeSet<Dimension>,
        base_weights: &WeightTable,
        outcomes: Outcomes,
        started: Instant,
    ) -> Result<AnalysisResult, AnalysisError> {
        let mut dimension_results = BTreeMap::new();
        let mut errors = BTreeMap::new();
        let mut scored = BTreeMap::new();

        for (dimension, outcome) in outcomes {
            match outcome {
                Ok(score) => {
                    scored.insert(dimension, score);
                }
                Err(failure) => {
                    warn!("[COORDINATOR] {} degraded: {}", dimension, failure);
                    let reason = failure.to_string();
                    dimension_results.insert(dimension, DimensionResult::failed(dimension, reason.clone()));
                    errors.insert(dimension, reason);
                }
            }
        }

        if scored.is_empty() {
            let summary = errors
                .iter()
                .map(|(d, e)| format!("{}: {}", d, e))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AnalysisError::Aggregation(summary));
        }

        let active: BTreeSet<Dimension> = scored.keys().copied().collect();
        let weights = WeightResolver::resolve(base_weights, &active)?;
        let ranker = EvidenceRanker::new(self.options.top_evidence_limit);

        let mut overall = 0.0;
        for (dimension, score) in scored {
            let weight = weights.get(&dimension).copied().unwrap_or(0.0);
            overall += weight * score.score;

            let ranked = ranker.rank(score.evidences);
            dimension_results.insert(
                dimension,
                DimensionResult {
                    dimension,
                    score: score.score,
                    weight,
                    active: true,
                    analysis_level: dimension.analysis_level(),
                    total_evidences: ranked.total(),
                    top_evidences: ranked.top().to_vec(),
                    evidences: ranked.into_all(),
                    failure: None,
                },
            );
        }

        let global_scores = Dimension::ALL
            .iter()
            .map(|d| {
                let score = dimension_results
                    .get(d)
                    .filter(|r: &&DimensionResult| r.active)
                    .map(|r| r.score);
                (*d, score)
            })
            .collect();
        let disabled_dimensions = Dimension::ALL
            .iter()
            .copied()
            .filter(|d| !enabled.contains(d))
            .collect();

        let elapsed = started.elapsed();
        Ok(AnalysisResult {
            overall_score: clamp_unit(overall),
            global_scores,
            dimension_results,
            weights_applied: weights,
            active_dimensions: active.into_iter().collect(),
            analysis_metadata: AnalysisMetadata {
                text_length: doc.char_len(),
                word_count: doc.token_count(),
                sentence_count: doc.sentence_count(),
                paragraph_count: doc.paragraph_count(),
                processing_time_ms: elapsed.as_millis() as u64,
                processing_time_seconds: round_f64(elapsed.as_secs_f64(), 3),
                weights_used: base_weights.clone(),
                max_concurrency: self.concurrency(enabled.len()),
                disabled_dimensions,
                errors,
            },
        })
    }
}
