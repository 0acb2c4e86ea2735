// Origo API layer
// Command functions mirroring the HTTP contract: analyze, weights, dimensions, export

mod export;

pub use export::{export_report, export_report_json, risk_band};

use crate::models::{AnalysisResult, AnalyzeRequest, Dimension, DimensionInfo, WeightTable};
use crate::services::config_store::{AppConfig, ConfigStore};
use crate::services::detection::{
    validate_weight_table, AnalysisCoordinator, AnalysisError, AnalysisOptions, WeightError,
};
use crate::services::providers::ScoringPrimitives;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Error surfaced to callers with the HTTP status it maps to.
#[derive(Debug, Clone, Serialize, Error, PartialEq)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: 500,
            message: message.into(),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Validation(_)
            | AnalysisError::EmptyText { .. }
            | AnalysisError::NoActiveDimensions => ApiError::bad_request(e.to_string()),
            AnalysisError::Segmentation(_) | AnalysisError::Aggregation(_) => {
                ApiError::internal(e.to_string())
            }
        }
    }
}

impl From<WeightError> for ApiError {
    fn from(e: WeightError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

/// Long-lived analysis service. Holds the current base weight table as an
/// immutable snapshot; each request reads the snapshot once.
pub struct OrigoService {
    coordinator: AnalysisCoordinator,
    weights: RwLock<Arc<WeightTable>>,
    store: Option<ConfigStore>,
    min_text_chars: usize,
    max_text_chars: usize,
}

impl OrigoService {
    pub fn new(config: &AppConfig, primitives: ScoringPrimitives, store: Option<ConfigStore>) -> Self {
        Self {
            coordinator: AnalysisCoordinator::new(
                primitives,
                AnalysisOptions::from_config(&config.analysis),
            ),
            weights: RwLock::new(Arc::new(config.weights.clone())),
            store,
            min_text_chars: config.analysis.min_text_chars,
            max_text_chars: config.analysis.max_text_chars,
        }
    }

    /// Default config with local primitives and no persistence.
    pub fn local() -> Self {
        Self::new(&AppConfig::default(), ScoringPrimitives::local(), None)
    }

    /// Load config from `store`, pick primitives from it, persist weight updates back.
    pub fn from_store(store: ConfigStore) -> Result<Self, String> {
        let config = store.load()?;
        let primitives = ScoringPrimitives::from_config(&config).map_err(|e| e.to_string())?;
        Ok(Self::new(&config, primitives, Some(store)))
    }

    fn weights_snapshot(&self) -> Result<Arc<WeightTable>, ApiError> {
        self.weights
            .read()
            .map(|w| Arc::clone(&*w))
            .map_err(|_| ApiError::internal("weight table lock poisoned"))
    }

    /// POST /analyze
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisResult, ApiError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("analyze", request_id = %request_id);

        async move {
            let chars = request.text.trim().chars().count();
            if chars < self.min_text_chars || chars > self.max_text_chars {
                warn!("[API] rejected text of {} characters", chars);
                return Err(AnalysisError::Validation(format!(
                    "Text must be between {} and {} characters, got {}",
                    self.min_text_chars, self.max_text_chars, chars
                ))
                .into());
            }

            let enabled = request.enabled_set();
            if enabled.is_empty() {
                return Err(AnalysisError::NoActiveDimensions.into());
            }

            let weights = self.weights_snapshot()?;
            info!("[API] analyze: {} chars, {} dimensions", chars, enabled.len());
            let result = self
                .coordinator
                .run(&request.text, &enabled, &weights)
                .await
                .map_err(|e| {
                    warn!("[API] analysis failed: {}", e);
                    ApiError::from(e)
                })?;
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// GET /weights
    pub fn get_weights(&self) -> Result<WeightTable, ApiError> {
        Ok(self.weights_snapshot()?.as_ref().clone())
    }

    /// POST /weights. Replaces the snapshot; requests already running keep the old one.
    pub fn update_weights(&self, table: WeightTable) -> Result<WeightTable, ApiError> {
        validate_weight_table(&table)?;

        if let Some(store) = &self.store {
            store.save_weights(&table).map_err(ApiError::internal)?;
        }

        let mut guard = self
            .weights
            .write()
            .map_err(|_| ApiError::internal("weight table lock poisoned"))?;
        *guard = Arc::new(table.clone());
        info!("[API] base weights updated");
        Ok(table)
    }

    /// GET /dimensions
    pub fn dimensions_info(&self) -> Vec<DimensionInfo> {
        Dimension::ALL.iter().map(Dimension::info).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::{HashingEmbedder, LanguageModel, ProviderError};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct FailingLm;

    #[async_trait]
    impl LanguageModel for FailingLm {
        async fn next_token_log_prob(&self, _c: &str, _t: &str) -> Result<f64, ProviderError> {
            Err(ProviderError::Unavailable("model offline".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn request(text: &str, disabled: &[Dimension]) -> AnalyzeRequest {
        let mut req = AnalyzeRequest::new(text);
        if !disabled.is_empty() {
            req.enabled_dimensions = Some(disabled.iter().map(|d| (*d, false)).collect());
        }
        req
    }

    fn skewed_weights() -> WeightTable {
        let mut map = BTreeMap::new();
        for d in Dimension::ALL {
            map.insert(d, if d == Dimension::Readability { 0.4 } else { 0.1 });
        }
        WeightTable::new(map)
    }

    #[tokio::test]
    async fn test_short_text_scenario_succeeds() {
        let result = OrigoService::local().analyze(request("Short AI test.", &[])).await.unwrap();
        assert_eq!(result.analysis_metadata.paragraph_count, 1);
        assert_eq!(result.analysis_metadata.sentence_count, 1);
        assert_eq!(result.global_scores[&Dimension::NgramRepetition], Some(0.5));
        assert_eq!(result.global_scores[&Dimension::SemanticCoherence], Some(0.5));

        let json = serde_json::to_value(&result).unwrap();
        for key in [
            "overall_score",
            "global_scores",
            "dimension_results",
            "weights_applied",
            "active_dimensions",
            "analysis_metadata",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert!(json["dimension_results"]["readability"]["topEvidences"][0]["startIndex"].is_number());
    }

    #[tokio::test]
    async fn test_length_violations_are_400() {
        let service = OrigoService::local();
        let err = service.analyze(request("too short", &[])).await.unwrap_err();
        assert_eq!(err.status, 400);
        assert!(err.message.contains("between 10 and 50000"), "{}", err.message);

        let long = "word ".repeat(10_001);
        let err = service.analyze(request(&long, &[])).await.unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[tokio::test]
    async fn test_all_disabled_is_400() {
        let err = OrigoService::local()
            .analyze(request("A perfectly valid sentence.", &Dimension::ALL))
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[tokio::test]
    async fn test_disabling_three_dimensions() {
        let disabled = [Dimension::Perplexity, Dimension::Burstiness, Dimension::Readability];
        let text = "The first sentence is here. The second sentence follows it.\n\nAnother paragraph begins.";
        let result = OrigoService::local().analyze(request(text, &disabled)).await.unwrap();
        assert_eq!(result.active_dimensions.len(), 4);
        let sum: f64 = result.weights_applied.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(result.analysis_metadata.disabled_dimensions, disabled.to_vec());
        assert_eq!(result.global_scores[&Dimension::Burstiness], None);
    }

    #[tokio::test]
    async fn test_total_failure_is_500() {
        let primitives = ScoringPrimitives::new(Arc::new(FailingLm), Arc::new(HashingEmbedder::default()));
        let service = OrigoService::new(&AppConfig::default(), primitives, None);
        let mut req = AnalyzeRequest::new("Only perplexity is enabled for this one.");
        req.enabled_dimensions = Some(
            Dimension::ALL
                .iter()
                .map(|d| (*d, *d == Dimension::Perplexity))
                .collect(),
        );
        let err = service.analyze(req).await.unwrap_err();
        assert_eq!(err.status, 500);
        assert!(err.message.contains("model offline"));
    }

    #[tokio::test]
    async fn test_weight_update_applies_to_next_request() {
        let service = OrigoService::local();
        assert_eq!(service.get_weights().unwrap(), WeightTable::default());

        service.update_weights(skewed_weights()).unwrap();
        assert_eq!(service.get_weights().unwrap(), skewed_weights());

        let result = service
            .analyze(request("Weights should follow the update. Indeed they do.", &[]))
            .await
            .unwrap();
        assert_eq!(result.analysis_metadata.weights_used, skewed_weights());
        assert!((result.weights_applied[&Dimension::Readability] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_weight_update_is_rejected() {
        let service = OrigoService::local();
        let mut map = WeightTable::default().as_map().clone();
        map.insert(Dimension::Perplexity, 0.9);
        let err = service.update_weights(WeightTable::new(map)).unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(service.get_weights().unwrap(), WeightTable::default());
    }

    #[test]
    fn test_weight_update_persists_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let service = OrigoService::from_store(ConfigStore::new(dir.path().to_path_buf())).unwrap();
        service.update_weights(skewed_weights()).unwrap();

        let reloaded = OrigoService::from_store(ConfigStore::new(dir.path().to_path_buf())).unwrap();
        assert_eq!(reloaded.get_weights().unwrap(), skewed_weights());
    }

    #[test]
    fn test_dimensions_info_lists_all_seven() {
        let info = OrigoService::local().dimensions_info();
        assert_eq!(info.len(), 7);
        assert_eq!(info[0].id, Dimension::Perplexity);
        assert!(info.iter().all(|i| !i.description.is_empty()));
    }
}
