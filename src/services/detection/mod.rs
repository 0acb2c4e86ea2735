// Detection Module
// Seven-dimension analysis engine organized into specialized submodules:
// - stats: numeric helpers and band transforms
// - perplexity .. readability: one analyzer per dimension
// - registry: enum-keyed dispatch over the analyzers
// - evidence: ranking and evidence construction
// - weights: base weight validation and renormalization
// - coordinator: parallel fan-out, deadline, aggregation

pub mod stats;
pub mod evidence;
pub mod weights;
pub mod perplexity;
pub mod burstiness;
pub mod semantic_coherence;
pub mod ngram_repetition;
pub mod lexical_richness;
pub mod stylistic_markers;
pub mod readability;
pub mod registry;
pub mod coordinator;

use crate::models::Evidence;
use crate::services::providers::ProviderError;
use thiserror::Error;

pub use coordinator::{AnalysisCoordinator, AnalysisOptions};
pub use evidence::{EvidenceRanker, RankedEvidence};
pub use registry::analyze_dimension;
pub use weights::{validate_weight_table, WeightError, WeightResolver};

/// Score used when a dimension has nothing to measure.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Request-fatal failures.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Text too short: {actual} characters, minimum is {min_chars}")]
    EmptyText { min_chars: usize, actual: usize },
    #[error("Segmentation failed: {0}")]
    Segmentation(String),
    #[error("No active dimensions")]
    NoActiveDimensions,
    #[error("All enabled dimensions failed: {0}")]
    Aggregation(String),
}

/// Failure local to one dimension; the request carries on without it.
#[derive(Error, Debug)]
pub enum AnalyzerFailure {
    #[error("primitive call failed: {0}")]
    Primitive(#[from] ProviderError),
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("analyzer aborted: {0}")]
    Aborted(String),
}

/// Raw analyzer output before ranking and weighting.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionScore {
    pub score: f64,
    pub evidences: Vec<Evidence>,
}

impl DimensionScore {
    pub fn new(score: f64, evidences: Vec<Evidence>) -> Self {
        Self {
            score: stats::clamp_unit(score),
            evidences,
        }
    }

    pub fn neutral() -> Self {
        Self::new(NEUTRAL_SCORE, Vec::new())
    }
}
