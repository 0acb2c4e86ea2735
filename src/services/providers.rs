// Scoring Primitive Providers
// Language-model and embedding primitives consumed by the perplexity and coherence analyzers

use crate::services::config_store::{AppConfig, ModelServerConfig};
use crate::services::text_processor::{fold_case, is_function_word, token_spans};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const MODEL_SERVER_URL_ENV: &str = "ORIGO_MODEL_SERVER_URL";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("Primitive unavailable: {0}")]
    Unavailable(String),
}

/// Next-token probability primitive. Log probabilities are natural logs.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn next_token_log_prob(&self, context: &str, token: &str) -> Result<f64, ProviderError>;

    /// Log probability of each token given the tokens before it.
    async fn sequence_log_probs(&self, tokens: &[String]) -> Result<Vec<f64>, ProviderError> {
        let mut out = Vec::with_capacity(tokens.len());
        for i in 0..tokens.len() {
            let context = tokens[..i].join(" ");
            out.push(self.next_token_log_prob(&context, &tokens[i]).await?);
        }
        Ok(out)
    }

    fn name(&self) -> &str;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    fn name(&self) -> &str;
}

/// Primitive handles injected into the analyzers of one request.
#[derive(Clone)]
pub struct ScoringPrimitives {
    pub language_model: Arc<dyn LanguageModel>,
    pub embedder: Arc<dyn Embedder>,
}

impl ScoringPrimitives {
    pub fn new(language_model: Arc<dyn LanguageModel>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            language_model,
            embedder,
        }
    }

    /// Deterministic offline primitives.
    pub fn local() -> Self {
        Self::new(
            Arc::new(HeuristicLanguageModel::default()),
            Arc::new(HashingEmbedder::default()),
        )
    }

    /// Model server when configured (env override first), local primitives otherwise.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let server = match std::env::var(MODEL_SERVER_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Some(ModelServerConfig {
                base_url: url.trim().to_string(),
                ..config.model_server.clone().unwrap_or_default()
            }),
            _ => config.model_server.clone(),
        };

        match server {
            Some(cfg) => {
                info!(base_url = %cfg.base_url, "[PRIMITIVES] using model server");
                let client = Arc::new(ModelServerClient::new(&cfg.base_url, cfg.timeout_secs)?);
                Ok(Self::new(client.clone(), client))
            }
            None => {
                debug!("[PRIMITIVES] using local heuristic primitives");
                Ok(Self::local())
            }
        }
    }
}

// ============ HTTP model server ============

#[derive(Debug, Serialize)]
struct LogProbRequest<'a> {
    context: &'a str,
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LogProbResponse {
    logprob: f64,
}

#[derive(Debug, Serialize)]
struct LogProbsRequest<'a> {
    tokens: &'a [String],
}

#[derive(Debug, Deserialize)]
struct LogProbsResponse {
    logprobs: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// JSON client for an external model server hosting both primitives.
pub struct ModelServerClient {
    client: Client,
    base_url: String,
}

impl ModelServerClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))
    }
}

#[async_trait]
impl LanguageModel for ModelServerClient {
    async fn next_token_log_prob(&self, context: &str, token: &str) -> Result<f64, ProviderError> {
        let resp: LogProbResponse = self
            .post_json("logprob", &LogProbRequest { context, token })
            .await?;
        Ok(resp.logprob)
    }

    async fn sequence_log_probs(&self, tokens: &[String]) -> Result<Vec<f64>, ProviderError> {
        let resp: LogProbsResponse = self.post_json("logprobs", &LogProbsRequest { tokens }).await?;
        if resp.logprobs.len() != tokens.len() {
            return Err(ProviderError::MalformedResponse(format!(
                "expected {} logprobs, got {}",
                tokens.len(),
                resp.logprobs.len()
            )));
        }
        Ok(resp.logprobs)
    }

    fn name(&self) -> &str {
        "model-server"
    }
}

#[async_trait]
impl Embedder for ModelServerClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let resp: EmbedResponse = self.post_json("embed", &EmbedRequest { text }).await?;
        if resp.embedding.is_empty() {
            return Err(ProviderError::MalformedResponse("empty embedding".to_string()));
        }
        Ok(resp.embedding)
    }

    fn name(&self) -> &str {
        "model-server"
    }
}

// ============ Local primitives ============

/// Context-frequency language model with a small common-word prior.
/// Repeated and common tokens are predictable; rare long words are not.
#[derive(Debug, Clone)]
pub struct HeuristicLanguageModel {
    function_word_prob: f64,
    content_word_prob: f64,
}

impl Default for HeuristicLanguageModel {
    fn default() -> Self {
        Self {
            function_word_prob: 0.06,
            content_word_prob: 0.01,
        }
    }
}

impl HeuristicLanguageModel {
    fn prior(&self, lower: &str) -> f64 {
        if is_function_word(lower) {
            self.function_word_prob
        } else {
            let len = lower.chars().count() as f64;
            self.content_word_prob / (1.0 + len / 8.0)
        }
    }
}

#[async_trait]
impl LanguageModel for HeuristicLanguageModel {
    async fn next_token_log_prob(&self, context: &str, token: &str) -> Result<f64, ProviderError> {
        let target = fold_case(token);
        let context_tokens: Vec<String> = token_spans(context)
            .into_iter()
            .map(|(s, e)| fold_case(&context[s..e]))
            .collect();

        let n = context_tokens.len() as f64;
        let seen = context_tokens.iter().filter(|t| **t == target).count() as f64;
        let lambda = n / (n + 5.0);
        let p = lambda * (seen / (n + 1.0)) + (1.0 - lambda) * self.prior(&target);

        Ok(p.max(1e-9).ln())
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// Hashed bag-of-words embedding over content words, L2 normalised.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dimensions: 256 }
    }
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, word: &str) -> (usize, f32) {
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        let hash = hasher.finish();
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        ((hash % self.dimensions as u64) as usize, sign)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vector = vec![0.0f32; self.dimensions];
        for (s, e) in token_spans(text) {
            let lower = fold_case(&text[s..e]);
            if is_function_word(&lower) {
                continue;
            }
            let (idx, sign) = self.bucket(&lower);
            vector[idx] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP responder; returns the base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if buf.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_heuristic_model_prefers_repeated_tokens() {
        let lm = HeuristicLanguageModel::default();
        let context = "the model predicts the model predicts the model";
        let repeated = lm.next_token_log_prob(context, "model").await.unwrap();
        let novel = lm.next_token_log_prob(context, "serendipitous").await.unwrap();
        assert!(repeated > novel);
        assert!(repeated < 0.0);
    }

    #[tokio::test]
    async fn test_default_sequence_log_probs_matches_single_calls() {
        let lm = HeuristicLanguageModel::default();
        let tokens: Vec<String> = ["a", "cat", "and", "a", "cat"].iter().map(|s| s.to_string()).collect();
        let seq = lm.sequence_log_probs(&tokens).await.unwrap();
        assert_eq!(seq.len(), 5);
        let last = lm.next_token_log_prob("a cat and a", "cat").await.unwrap();
        assert_eq!(seq[4], last);
    }

    #[tokio::test]
    async fn test_hashing_embedder_is_normalised_and_deterministic() {
        let e = HashingEmbedder::default();
        let a = e.embed("Rust makes systems programming pleasant").await.unwrap();
        let b = e.embed("Rust makes systems programming pleasant").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        let empty = e.embed("the and of").await.unwrap();
        assert!(empty.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_model_server_embed() {
        let base = serve_once("HTTP/1.1 200 OK", r#"{"embedding":[0.5,0.5,0.0]}"#).await;
        let client = ModelServerClient::new(&base, 5).unwrap();
        assert!(!client.base_url().ends_with('/'));
        let v = client.embed("hello").await.unwrap();
        assert_eq!(v, vec![0.5, 0.5, 0.0]);
    }

    #[tokio::test]
    async fn test_model_server_logprobs_length_checked() {
        let base = serve_once("HTTP/1.1 200 OK", r#"{"logprobs":[-1.0]}"#).await;
        let client = ModelServerClient::new(&base, 5).unwrap();
        let tokens = vec!["a".to_string(), "b".to_string()];
        let err = client.sequence_log_probs(&tokens).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_model_server_api_error() {
        let base = serve_once("HTTP/1.1 503 Service Unavailable", r#"{"error":"loading"}"#).await;
        let client = ModelServerClient::new(&base, 5).unwrap();
        let err = client.next_token_log_prob("ctx", "tok").await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status: 503, .. }));
    }

    #[test]
    fn test_from_config_without_server_is_local() {
        std::env::remove_var(MODEL_SERVER_URL_ENV);
        let prims = ScoringPrimitives::from_config(&AppConfig::default()).unwrap();
        assert_eq!(prims.language_model.name(), "heuristic");
        assert_eq!(prims.embedder.name(), "hashing");
    }
}
