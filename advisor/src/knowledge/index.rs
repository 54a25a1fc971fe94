//! Vector index client and content-addressed record identifiers.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

use shared_types::{RetrievedMatch, VectorRecord};

use crate::knowledge::KnowledgeError;

/// Derive the stable identifier for an embedding.
///
/// Every component is serialized at exactly six decimal places and
/// comma-joined before hashing, so byte-identical embeddings map to the same
/// SHA-256 hex digest across processes and runs. Unchanged facts re-ingest
/// as overwrites; changed facts land under a new id.
pub fn embedding_id(embedding: &[f32]) -> String {
    let serialized = embedding
        .iter()
        .map(|component| format!("{component:.6}"))
        .collect::<Vec<_>>()
        .join(",");
    hex::encode(Sha256::digest(serialized.as_bytes()))
}

/// Insert/query contract of the external vector index.
///
/// `upsert` is insert-or-overwrite by record id; `query` returns up to
/// `top_k` nearest records, best first, with their stored text.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), KnowledgeError>;
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedMatch>, KnowledgeError>;
}

// ─── Pinecone client ─────────────────────────────────────────────────────────

/// HTTP client for a Pinecone-style index endpoint.
pub struct PineconeIndex {
    http: reqwest::Client,
    host: String,
    api_key: String,
}

impl PineconeIndex {
    pub fn new(
        host: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, KnowledgeError> {
        let api_key = api_key.ok_or(KnowledgeError::MissingApiKey("PINECONE_API_KEY"))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KnowledgeError::Transport {
                service: "vector index",
                detail: format!("client build: {e}"),
            })?;
        Ok(Self {
            http,
            host: host.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, KnowledgeError> {
        let response = self
            .http
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| KnowledgeError::from_reqwest("vector index", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::Transport {
                service: "vector index",
                detail: format!("status {status}: {body}"),
            });
        }

        response
            .json()
            .await
            .map_err(|e| KnowledgeError::Parse {
                service: "vector index",
                detail: e.to_string(),
            })
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), KnowledgeError> {
        if records.is_empty() {
            return Ok(());
        }

        let vectors: Vec<Value> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id,
                    "values": r.embedding,
                    "metadata": { "text": r.text },
                })
            })
            .collect();

        self.post_json("/vectors/upsert", serde_json::json!({ "vectors": vectors }))
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedMatch>, KnowledgeError> {
        let payload = self
            .post_json(
                "/query",
                serde_json::json!({
                    "vector": vector,
                    "topK": top_k,
                    "includeMetadata": true,
                }),
            )
            .await?;

        let matches = payload
            .get("matches")
            .and_then(|v| v.as_array())
            .ok_or_else(|| KnowledgeError::Parse {
                service: "vector index",
                detail: "missing matches array".to_string(),
            })?;

        Ok(matches
            .iter()
            .map(|row| RetrievedMatch {
                id: row
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                score: row.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
                text: row
                    .get("metadata")
                    .and_then(|m| m.get("text"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect())
    }
}

/// Upsert records in fixed-size batches, sequentially.
///
/// Best-effort: a failed batch is logged and later batches still run.
/// Returns `(batches, failed_batches)`.
pub async fn upsert_in_batches(
    index: &dyn VectorIndex,
    records: &[VectorRecord],
    batch_size: usize,
) -> (usize, usize) {
    let mut batches = 0usize;
    let mut failed = 0usize;

    for chunk in records.chunks(batch_size.max(1)) {
        batches += 1;
        if let Err(e) = index.upsert(chunk).await {
            failed += 1;
            tracing::warn!(
                error = %e,
                batch = batches,
                size = chunk.len(),
                "vector batch upsert failed; continuing with remaining batches"
            );
        }
    }

    (batches, failed)
}
