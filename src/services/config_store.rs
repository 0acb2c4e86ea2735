// Configuration Storage Service
// Handles config file read/write and version backup

use crate::models::WeightTable;
use crate::services::detection::validate_weight_table;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub version: String,
    pub analysis: AnalysisConfig,
    pub weights: WeightTable,
    pub model_server: Option<ModelServerConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            analysis: AnalysisConfig::default(),
            weights: WeightTable::default(),
            model_server: None,
        }
    }
}

impl AppConfig {
    /// Reject configs the analyzers cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        let a = &self.analysis;
        if a.min_text_chars > a.max_text_chars {
            return Err(format!(
                "minTextChars ({}) exceeds maxTextChars ({})",
                a.min_text_chars, a.max_text_chars
            ));
        }
        if a.max_concurrency == 0 {
            return Err("maxConcurrency must be at least 1".to_string());
        }
        if a.deadline_ms == 0 {
            return Err("deadlineMs must be positive".to_string());
        }
        a.bands.validate()?;
        validate_weight_table(&self.weights).map_err(|e| format!("weights: {}", e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    pub min_text_chars: usize,
    pub max_text_chars: usize,
    /// Overall per-request deadline covering every analyzer.
    pub deadline_ms: u64,
    pub max_concurrency: usize,
    pub top_evidence_limit: usize,
    pub bands: ScoringBands,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 10,
            max_text_chars: 50_000,
            deadline_ms: 30_000,
            max_concurrency: 4,
            top_evidence_limit: 10,
            bands: ScoringBands::default(),
        }
    }
}

/// Raw metric range mapped linearly onto [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearBand {
    pub low: f64,
    pub high: f64,
}

/// Natural range; values outside it raise suspicion on either side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NaturalBand {
    pub low: f64,
    pub high: f64,
    /// Distance below `low` that reaches full suspicion.
    pub low_span: f64,
    /// Distance above `high` that reaches full suspicion.
    pub high_span: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NgramSettings {
    pub sizes: Vec<usize>,
    pub min_tokens: usize,
    /// Share of the repetition rate in the blend; entropy takes the rest.
    pub repetition_weight: f64,
}

impl Default for NgramSettings {
    fn default() -> Self {
        Self {
            sizes: vec![2, 3, 4],
            min_tokens: 10,
            repetition_weight: 0.6,
        }
    }
}

/// Every transform boundary used by the analyzers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringBands {
    /// Sentence perplexity; `low` maps to 1.0, `high` to 0.0.
    pub perplexity: LinearBand,
    /// Coefficient of variation of sentence lengths.
    pub burstiness: NaturalBand,
    /// Mean adjacent-paragraph cosine similarity.
    pub semantic: LinearBand,
    pub ngram: NgramSettings,
    /// Type-token ratio normalisation range.
    pub lexical: LinearBand,
    /// Scale of the 1 - exp(-v / scale) variance transform.
    pub stylistic_scale: f64,
    /// Flesch Reading Ease.
    pub readability: NaturalBand,
}

impl Default for ScoringBands {
    fn default() -> Self {
        Self {
            perplexity: LinearBand { low: 10.0, high: 100.0 },
            burstiness: NaturalBand {
                low: 0.2,
                high: 0.8,
                low_span: 0.2,
                high_span: 0.8,
            },
            semantic: LinearBand { low: 0.0, high: 1.0 },
            ngram: NgramSettings::default(),
            lexical: LinearBand { low: 0.4, high: 1.0 },
            stylistic_scale: 0.02,
            readability: NaturalBand {
                low: 30.0,
                high: 90.0,
                low_span: 30.0,
                high_span: 30.0,
            },
        }
    }
}

impl ScoringBands {
    pub fn validate(&self) -> Result<(), String> {
        for (name, band) in [
            ("perplexity", &self.perplexity),
            ("semantic", &self.semantic),
            ("lexical", &self.lexical),
        ] {
            if !(band.low.is_finite() && band.high.is_finite() && band.low < band.high) {
                return Err(format!("{} band requires low < high", name));
            }
        }
        for (name, band) in [("burstiness", &self.burstiness), ("readability", &self.readability)] {
            if !(band.low <= band.high && band.low_span > 0.0 && band.high_span > 0.0) {
                return Err(format!("{} band requires low <= high and positive spans", name));
            }
        }
        if self.ngram.sizes.is_empty() || self.ngram.sizes.contains(&0) {
            return Err("ngram sizes must be non-empty and positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.ngram.repetition_weight) {
            return Err("ngram repetitionWeight must lie in [0, 1]".to_string());
        }
        if self.stylistic_scale.is_nan() || self.stylistic_scale <= 0.0 {
            return Err("stylisticScale must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelServerConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelServerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 { 20 }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("origo"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file, defaults when absent
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Replace only the weight table in the stored config
    pub fn save_weights(&self, weights: &WeightTable) -> Result<(), String> {
        let mut config = self.load()?;
        config.weights = weights.clone();
        self.save(&config)
    }

    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Backup names embed the timestamp, so name order is age order
        entries.sort_by_key(|e| e.file_name());

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dimension;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.min_text_chars, 10);
        assert_eq!(config.analysis.max_text_chars, 50_000);
        assert_eq!(config.analysis.top_evidence_limit, 10);
        assert!(config.model_server.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"analysis":{"deadlineMs":500,"bands":{"stylisticScale":0.1}}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.analysis.deadline_ms, 500);
        assert_eq!(config.analysis.max_concurrency, 4);
        assert_eq!(config.analysis.bands.stylistic_scale, 0.1);
        assert_eq!(config.analysis.bands.ngram.sizes, vec![2, 3, 4]);
        assert_eq!(config.weights, WeightTable::default());
    }

    #[test]
    fn test_validate_rejects_bad_bands() {
        let mut config = AppConfig::default();
        config.analysis.bands.lexical = LinearBand { low: 0.9, high: 0.1 };
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analysis.max_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("cfg"));
        let config = store.load().unwrap();
        assert_eq!(config.version, "1.0.0");
    }

    #[test]
    fn test_load_rejects_incomplete_weight_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        store.ensure_dir().unwrap();
        fs::write(
            store.config_file(),
            r#"{"weights":{"perplexity":5.0,"readability":3.0}}"#,
        )
        .unwrap();

        let err = store.load().unwrap_err();
        assert!(err.starts_with("weights:"), "{}", err);
    }

    #[test]
    fn test_load_rejects_weights_not_summing_to_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        let mut config = AppConfig::default();
        let mut map = config.weights.as_map().clone();
        map.insert(Dimension::Readability, 0.5);
        config.weights = WeightTable::new(map);
        assert!(config.validate().is_err());

        store.ensure_dir().unwrap();
        fs::write(store.config_file(), serde_json::to_string(&config).unwrap()).unwrap();
        assert!(store.load().is_err());
    }

    #[test]
    fn test_save_weights_round_trip_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        store.save(&AppConfig::default()).unwrap();

        let mut map = std::collections::BTreeMap::new();
        for d in Dimension::ALL {
            map.insert(d, if d == Dimension::Perplexity { 0.4 } else { 0.1 });
        }
        let table = WeightTable::new(map);
        store.save_weights(&table).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.weights, table);
        let backups = fs::read_dir(dir.path().join("backups")).unwrap().count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_backups_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        let backup_dir = dir.path().join("backups");
        fs::create_dir_all(&backup_dir).unwrap();
        for i in 0..12 {
            fs::write(backup_dir.join(format!("config_2024010{:02}.json", i)), "{}").unwrap();
        }
        store.cleanup_old_backups(&backup_dir, 10).unwrap();
        let remaining = fs::read_dir(&backup_dir).unwrap().count();
        assert_eq!(remaining, 10);
        assert!(!backup_dir.join("config_202401000.json").exists());
    }
}
