//! Embeddings from an OpenAI-compatible `/embeddings` endpoint.
//!
//! Only available with the `openai` feature.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::{EmbeddingProvider, check_dimensions};
use crate::error::{QaError, Result};

const PROVIDER: &str = "OpenAI";

/// Largest number of inputs the API accepts in one request.
const MAX_INPUTS_PER_REQUEST: usize = 2048;

/// Connection and model settings for [`OpenAIEmbeddingProvider`].
///
/// Missing fields take their defaults when deserialized, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    /// API root, without the trailing `/embeddings`.
    pub base_url: String,
    /// Embedding model name.
    pub model: String,
    /// Vector size produced by `model`.
    pub dimensions: usize,
    /// Ask the API to shorten vectors to `dimensions` (Matryoshka models).
    pub truncate_dimensions: bool,
    /// Inputs per request; larger batches are split.
    pub batch_size: usize,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            truncate_dimensions: false,
            batch_size: MAX_INPUTS_PER_REQUEST,
        }
    }
}

impl OpenAIConfig {
    /// Check that the settings can produce requests.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::ConfigError`] for an empty URL or model, zero
    /// dimensions, or a batch size outside `1..=2048`.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(QaError::ConfigError("base_url must not be empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(QaError::ConfigError("model must not be empty".to_string()));
        }
        if self.dimensions == 0 {
            return Err(QaError::ConfigError("dimensions must be greater than zero".to_string()));
        }
        if !(1..=MAX_INPUTS_PER_REQUEST).contains(&self.batch_size) {
            return Err(QaError::ConfigError(format!(
                "batch_size must be between 1 and {MAX_INPUTS_PER_REQUEST}, got {}",
                self.batch_size
            )));
        }
        Ok(())
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }
}

fn api_error(message: impl Into<String>) -> QaError {
    QaError::EmbeddingError { provider: PROVIDER.to_string(), message: message.into() }
}

/// An [`EmbeddingProvider`] calling an OpenAI-compatible embeddings API.
///
/// # Example
///
/// ```rust,ignore
/// use docqa::openai::{OpenAIConfig, OpenAIEmbeddingProvider};
///
/// let config = OpenAIConfig { dimensions: 768, truncate_dimensions: true, ..Default::default() };
/// let provider = OpenAIEmbeddingProvider::from_env(config)?;
/// let embedding = provider.embed("statute of limitations").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    config: OpenAIConfig,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::ConfigError`] for an empty key or invalid config.
    pub fn new(api_key: impl Into<String>, config: OpenAIConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(QaError::ConfigError("API key must not be empty".to_string()));
        }
        config.validate()?;
        Ok(Self { client: reqwest::Client::new(), api_key, config })
    }

    /// Create a provider reading the key from `OPENAI_API_KEY`.
    pub fn from_env(config: OpenAIConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| QaError::ConfigError("OPENAI_API_KEY is not set".to_string()))?;
        Self::new(api_key, config)
    }

    /// The provider settings.
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.config.model,
            input: texts,
            dimensions: self.config.truncate_dimensions.then_some(self.config.dimensions),
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                api_error(format!("request failed: {e}"))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| api_error(format!("unreadable body: {e}")))?;
        if !status.is_success() {
            error!(provider = PROVIDER, %status, "embedding request rejected");
            return Err(api_error(format!("{status}: {}", error_detail(&text))));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&text)
            .map_err(|e| api_error(format!("malformed response: {e}")))?;
        into_ordered(parsed.data, texts.len(), self.config.dimensions)
    }
}

impl std::fmt::Debug for OpenAIEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIEmbeddingProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// The `error.message` of an API error body, or the body itself.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Put response items back in request order and check their shape.
fn into_ordered(
    mut data: Vec<EmbeddingData>,
    expected: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(api_error(format!("expected {expected} embeddings, got {}", data.len())));
    }
    data.sort_by_key(|d| d.index);
    data.into_iter()
        .map(|d| {
            check_dimensions(&d.embedding, dimensions)?;
            Ok(d.embedding)
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text])
            .await?
            .pop()
            .ok_or_else(|| api_error("no embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            debug!(
                provider = PROVIDER,
                model = %self.config.model,
                inputs = batch.len(),
                "embedding batch"
            );
            embeddings.extend(self.request(batch).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }
}
