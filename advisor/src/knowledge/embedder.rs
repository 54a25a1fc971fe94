//! Text embedding clients.
//!
//! The live implementation talks to a HuggingFace Inference
//! feature-extraction endpoint. The stub produces deterministic hash-seeded
//! vectors so gate and pipeline tests never need network access or a model.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use shared_types::EMBEDDING_DIM;

use crate::config::Config;
use crate::knowledge::KnowledgeError;

/// Converts an ordered batch of texts into an ordered batch of embeddings.
///
/// The result is positionally aligned with the input: embedding `i` belongs
/// to text `i`. Implementations must preserve that alignment or fail.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError>;
}

// ─── HuggingFace client ──────────────────────────────────────────────────────

/// HTTP client for the HuggingFace feature-extraction pipeline.
pub struct HfEmbedder {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HfEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, KnowledgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KnowledgeError::Transport {
                service: "embedding",
                detail: format!("client build: {e}"),
            })?;
        let endpoint = format!(
            "{}/pipeline/feature-extraction/{}",
            base_url.trim_end_matches('/'),
            model
        );
        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl TextEmbedder for HfEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "inputs": texts }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| KnowledgeError::from_reqwest("embedding", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::Transport {
                service: "embedding",
                detail: format!("status {status}: {body}"),
            });
        }

        let embeddings: Vec<Vec<f32>> =
            response
                .json()
                .await
                .map_err(|e| KnowledgeError::Parse {
                    service: "embedding",
                    detail: e.to_string(),
                })?;

        // Positional alignment is part of the contract; a count mismatch
        // means we cannot tell which embedding belongs to which text.
        if embeddings.len() != texts.len() {
            return Err(KnowledgeError::Parse {
                service: "embedding",
                detail: format!(
                    "{} embeddings returned for {} inputs",
                    embeddings.len(),
                    texts.len()
                ),
            });
        }

        Ok(embeddings)
    }
}

// ─── Stub ────────────────────────────────────────────────────────────────────

/// Deterministic offline embedder.
///
/// Each text's SHA-256 digest seeds an xorshift generator that fills a
/// 384-dim vector. Same string → identical vector (cosine 1.0); different
/// strings → effectively uncorrelated vectors. Never zero-magnitude.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubEmbedder;

impl StubEmbedder {
    pub fn vector_for(text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());
        let mut state = u64::from_le_bytes(digest[..8].try_into().expect("digest >= 8 bytes"));
        if state == 0 {
            state = 0x9E37_79B9_7F4A_7C15;
        }
        (0..EMBEDDING_DIM)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state as f64 / u64::MAX as f64) as f32 * 2.0 - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl TextEmbedder for StubEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }
}

/// Build the embedder the configuration asks for.
pub fn embedder_from_config(config: &Config) -> Result<Arc<dyn TextEmbedder>, KnowledgeError> {
    if config.stub_embedder {
        tracing::warn!("stub embedder enabled; embeddings are hash-seeded, not semantic");
        return Ok(Arc::new(StubEmbedder));
    }
    Ok(Arc::new(HfEmbedder::new(
        &config.embedding_base_url,
        &config.embedding_model,
        config.embedding_api_key.clone(),
        config.request_timeout,
    )?))
}
