use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The external embedding-provider boundary. The core never depends on a
/// specific backend, only on this trait; failures surface as
/// `Error::ProviderUnavailable` and the caller decides whether to degrade
/// (e.g. hybrid search falling back to keyword-only).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: &[&str]) -> pkm_error::Result<Vec<Vec<f32>>>;
    fn model_name(&self) -> &str;
    fn dimension(&self) -> usize;
}

/// Calls an HTTP embedding endpoint (default: a local Ollama-compatible
/// `/api/embeddings` route) with a per-call timeout and bounded retry with
/// exponential backoff.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimension: usize,
    max_attempts: u32,
    initial_backoff: Duration,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl HttpEmbeddingProvider {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, dimension: usize) -> pkm_error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| pkm_error::Error::ProviderUnavailable(e.to_string()))?;

        Ok(HttpEmbeddingProvider {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            dimension,
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        })
    }

    async fn embed_one(&self, text: &str) -> pkm_error::Result<Vec<f32>> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = self
                .client
                .post(&self.endpoint)
                .json(&EmbedRequest {
                    model: &self.model,
                    prompt: text,
                })
                .send()
                .await
                .and_then(|resp| resp.error_for_status());

            match result {
                Ok(resp) => {
                    let parsed: EmbedResponse = resp
                        .json()
                        .await
                        .map_err(|e| pkm_error::Error::ProviderUnavailable(e.to_string()))?;
                    return Ok(parsed.embedding);
                }
                Err(e) if attempt < self.max_attempts => {
                    let backoff = self.initial_backoff * 2u32.pow(attempt - 1);
                    tracing::warn!(error = %e, attempt, "embedding call failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(pkm_error::Error::ProviderUnavailable(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> pkm_error::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_one(text).await?);
        }
        Ok(out)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Returns an empty vector for every input unconditionally. Matches the
/// protocol's "failures return an empty vector" contract for environments
/// with no embedding backend configured (tests, offline vaults).
pub struct NullEmbeddingProvider {
    model: String,
    dimension: usize,
}

impl NullEmbeddingProvider {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        NullEmbeddingProvider {
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> pkm_error::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| Vec::new()).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_provider_returns_empty_vectors() {
        let provider = NullEmbeddingProvider::new("test-model", 8);
        let out = provider.embed_batch(&["a", "b"]).await.unwrap();
        assert_eq!(out, vec![Vec::<f32>::new(), Vec::<f32>::new()]);
    }
}
