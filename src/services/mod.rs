// Origo core services

pub mod config_store;
pub mod detection;
pub mod providers;
pub mod segmenter;
pub mod text_processor;

pub use config_store::{AppConfig, ConfigStore};
pub use detection::{AnalysisCoordinator, AnalysisError, AnalysisOptions};
pub use providers::{Embedder, LanguageModel, ProviderError, ScoringPrimitives};
pub use segmenter::{Document, TextSegmenter};
