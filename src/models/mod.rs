// Origo Data Models
// Wire and domain types shared by the analyzers, coordinator and API layer

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

// ============ Dimensions ============

/// The closed set of analysis dimensions.
///
/// Declaration order is the canonical order used for maps, logs and the
/// `active_dimensions` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Perplexity,
    Burstiness,
    SemanticCoherence,
    NgramRepetition,
    LexicalRichness,
    StylisticMarkers,
    Readability,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Perplexity,
        Dimension::Burstiness,
        Dimension::SemanticCoherence,
        Dimension::NgramRepetition,
        Dimension::LexicalRichness,
        Dimension::StylisticMarkers,
        Dimension::Readability,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Perplexity => "perplexity",
            Dimension::Burstiness => "burstiness",
            Dimension::SemanticCoherence => "semantic_coherence",
            Dimension::NgramRepetition => "ngram_repetition",
            Dimension::LexicalRichness => "lexical_richness",
            Dimension::StylisticMarkers => "stylistic_markers",
            Dimension::Readability => "readability",
        }
    }

    /// Granularity of the atomic scoring unit.
    pub fn analysis_level(&self) -> AnalysisLevel {
        match self {
            Dimension::Perplexity
            | Dimension::LexicalRichness
            | Dimension::StylisticMarkers
            | Dimension::Readability => AnalysisLevel::Sentence,
            Dimension::Burstiness | Dimension::SemanticCoherence => AnalysisLevel::Paragraph,
            Dimension::NgramRepetition => AnalysisLevel::Global,
        }
    }

    pub fn info(&self) -> DimensionInfo {
        let (name, description, interpretation) = match self {
            Dimension::Perplexity => (
                "Perplexity",
                "Measures how predictable each sentence is under a language model",
                "High = highly predictable wording, typical of generated text",
            ),
            Dimension::Burstiness => (
                "Burstiness",
                "Measures variability in sentence lengths within paragraphs using coefficient of variation",
                "Very low = monotonous, very high = unnatural oscillation",
            ),
            Dimension::SemanticCoherence => (
                "Semantic Coherence",
                "Measures embedding similarity between adjacent paragraphs",
                "High = uniformly on-topic flow, low = abrupt topic shifts",
            ),
            Dimension::NgramRepetition => (
                "N-gram Repetition",
                "Measures repeated 2/3/4-word sequences and the entropy of their distribution",
                "High = repetitive phrasing and low n-gram diversity",
            ),
            Dimension::LexicalRichness => (
                "Lexical Richness",
                "Measures vocabulary diversity through sentence type-token ratios",
                "High = narrow, repetitive vocabulary",
            ),
            Dimension::StylisticMarkers => (
                "Stylistic Markers",
                "Measures the spread of punctuation and function-word profiles across sentences",
                "High = sentences deviate strongly from their paragraph's style",
            ),
            Dimension::Readability => (
                "Readability",
                "Measures Flesch Reading Ease against an ideal band",
                "High = too simplistic or too complex compared to natural prose",
            ),
        };
        DimensionInfo {
            id: *self,
            name: name.to_string(),
            description: description.to_string(),
            score_interpretation: interpretation.to_string(),
            analysis_level: self.analysis_level(),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == key)
            .ok_or_else(|| format!("unknown dimension: {}", s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisLevel {
    Sentence,
    Paragraph,
    Global,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionInfo {
    pub id: Dimension,
    pub name: String,
    pub description: String,
    pub score_interpretation: String,
    pub analysis_level: AnalysisLevel,
}

// ============ Evidence ============

/// Kind-specific part of an evidence item. Serialized inline, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EvidencePayload {
    Sentence {
        paragraph_index: usize,
        sentence_index: usize,
    },
    Paragraph {
        paragraph_index: usize,
    },
    ParagraphPair {
        first: usize,
        second: usize,
        similarity: f64,
    },
    Ngram {
        n: usize,
        count: usize,
        gram: String,
    },
}

/// A ranked, explained excerpt supporting a dimension score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub text: String,
    #[serde(alias = "score")]
    pub severity: f64,
    /// Char offset (0-based) into the analyzed text.
    pub start_index: usize,
    /// Char offset (0-based, end-exclusive) into the analyzed text.
    pub end_index: usize,
    pub reason: String,
    #[serde(flatten)]
    pub payload: EvidencePayload,
}

impl Evidence {
    pub fn new(
        text: impl Into<String>,
        severity: f64,
        start_index: usize,
        end_index: usize,
        reason: impl Into<String>,
        payload: EvidencePayload,
    ) -> Self {
        Self {
            text: text.into(),
            severity: clamp_unit(severity),
            start_index,
            end_index,
            reason: reason.into(),
            payload,
        }
    }
}

// ============ Dimension Result ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionResult {
    pub dimension: Dimension,
    pub score: f64,
    pub weight: f64,
    pub active: bool,
    pub analysis_level: AnalysisLevel,
    pub total_evidences: usize,
    /// Leading slice of `evidences`, at most the configured limit.
    pub top_evidences: Vec<Evidence>,
    /// Full ranked list, kept for export.
    pub evidences: Vec<Evidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl DimensionResult {
    /// Result for a dimension that failed during analysis.
    pub fn failed(dimension: Dimension, reason: impl Into<String>) -> Self {
        Self {
            dimension,
            score: 0.0,
            weight: 0.0,
            active: false,
            analysis_level: dimension.analysis_level(),
            total_evidences: 0,
            top_evidences: Vec::new(),
            evidences: Vec::new(),
            failure: Some(reason.into()),
        }
    }
}

// ============ Analysis Result ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub text_length: usize,
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub processing_time_ms: u64,
    pub processing_time_seconds: f64,
    pub weights_used: WeightTable,
    pub max_concurrency: usize,
    #[serde(default)]
    pub disabled_dimensions: Vec<Dimension>,
    /// Dimensions that were enabled but degraded, with the failure reason.
    #[serde(default)]
    pub errors: BTreeMap<Dimension, String>,
}

/// Terminal artifact of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub overall_score: f64,
    /// Every dimension appears; `None` for disabled or failed ones.
    pub global_scores: BTreeMap<Dimension, Option<f64>>,
    pub dimension_results: BTreeMap<Dimension, DimensionResult>,
    pub weights_applied: BTreeMap<Dimension, f64>,
    pub active_dimensions: Vec<Dimension>,
    pub analysis_metadata: AnalysisMetadata,
}

// ============ Weights ============

/// Base weight table. Treated as an immutable value: updates build a new table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable {
    weights: BTreeMap<Dimension, f64>,
}

impl WeightTable {
    pub fn new(weights: BTreeMap<Dimension, f64>) -> Self {
        Self { weights }
    }

    pub fn get(&self, dimension: Dimension) -> Option<f64> {
        self.weights.get(&dimension).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        self.weights.iter().map(|(d, w)| (*d, *w))
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn as_map(&self) -> &BTreeMap<Dimension, f64> {
        &self.weights
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        let weights = Dimension::ALL
            .iter()
            .map(|d| {
                let w = if *d == Dimension::Readability { 0.142 } else { 0.143 };
                (*d, w)
            })
            .collect();
        Self { weights }
    }
}

// ============ Requests ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    /// Missing dimensions default to enabled.
    #[serde(default)]
    pub enabled_dimensions: Option<BTreeMap<Dimension, bool>>,
}

impl AnalyzeRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            enabled_dimensions: None,
        }
    }

    pub fn enabled_set(&self) -> BTreeSet<Dimension> {
        Dimension::ALL
            .iter()
            .copied()
            .filter(|d| {
                self.enabled_dimensions
                    .as_ref()
                    .and_then(|m| m.get(d).copied())
                    .unwrap_or(true)
            })
            .collect()
    }
}

// ============ Export ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOverview {
    pub overall_score: f64,
    pub overall_percent: String,
    pub risk_band: String,
    pub global_scores: BTreeMap<Dimension, Option<f64>>,
    pub active_dimensions: Vec<Dimension>,
    pub metadata: AnalysisMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSection {
    pub dimension: Dimension,
    pub name: String,
    pub score: Option<f64>,
    pub weight: f64,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub total_evidences: usize,
    /// Untruncated, ranked evidence list.
    pub evidences: Vec<Evidence>,
}

/// Input contract for the external report renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    pub overview: ExportOverview,
    pub sections: Vec<ExportSection>,
    pub generated_at: String,
}

// ============ Helpers ============

/// Clamp into [0, 1]; NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
