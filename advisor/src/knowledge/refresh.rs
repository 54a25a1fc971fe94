//! The refresh pipeline wiring: gate → parse → embed → upsert, plus the
//! retrieval query the chat turn uses for answer context.

use std::sync::Arc;

use chrono::Utc;

use shared_types::{RefreshOutcome, RefreshReport, VectorRecord};

use crate::knowledge::index::upsert_in_batches;
use crate::knowledge::listings::{fetch_listing_document, parse_listing_document};
use crate::knowledge::{embedding_id, RefreshGate, TextEmbedder, VectorIndex};

/// One refresh pipeline over injected collaborators.
///
/// The embedder and index are trait objects so tests substitute
/// deterministic fakes; production wiring builds them from configuration.
pub struct KnowledgePipeline {
    embedder: Arc<dyn TextEmbedder>,
    index: Arc<dyn VectorIndex>,
    http: reqwest::Client,
    gate: RefreshGate,
    listing_url: String,
    upsert_batch_size: usize,
    retrieval_top_k: usize,
}

impl KnowledgePipeline {
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        index: Arc<dyn VectorIndex>,
        http: reqwest::Client,
        gate: RefreshGate,
        listing_url: String,
        upsert_batch_size: usize,
        retrieval_top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            http,
            gate,
            listing_url,
            upsert_batch_size,
            retrieval_top_k,
        }
    }

    /// Per-turn entry point: check the gate, and when it fires run a full
    /// refresh to completion before returning. The caller's subsequent
    /// retrieval therefore sees data at least as fresh as this refresh.
    pub async fn maybe_refresh(&self, utterance: &str) -> RefreshOutcome {
        if !self
            .gate
            .should_refresh(self.embedder.as_ref(), utterance)
            .await
        {
            return RefreshOutcome::skipped();
        }

        tracing::info!("refresh gate triggered; updating internship knowledge");
        let report = self.refresh().await;
        RefreshOutcome {
            triggered: true,
            report: Some(report),
        }
    }

    /// Fetch the listing document and ingest it. Fetch failures degrade to an
    /// empty cycle; they never propagate.
    pub async fn refresh(&self) -> RefreshReport {
        let document = match fetch_listing_document(&self.http, &self.listing_url).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(error = %e, url = %self.listing_url, "listing fetch failed; refresh skipped");
                return empty_report();
            }
        };
        self.refresh_from_document(&document).await
    }

    /// Ingest an already-fetched listing document: parse to sentences, embed,
    /// derive content-addressed ids, and upsert in sequential batches.
    pub async fn refresh_from_document(&self, document: &str) -> RefreshReport {
        let sentences = match parse_listing_document(document) {
            Ok(sentences) => sentences,
            Err(e) => {
                tracing::warn!(error = %e, "listing document structure changed; refresh skipped");
                return empty_report();
            }
        };
        if sentences.is_empty() {
            tracing::warn!("listing document yielded no open rows");
            return empty_report();
        }

        // An unavailable embedder means no records this cycle, not a crash.
        let embeddings = match self.embedder.embed(&sentences).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                tracing::warn!(error = %e, "embedding service unavailable; refresh skipped");
                Vec::new()
            }
        };

        let records: Vec<VectorRecord> = sentences
            .iter()
            .zip(embeddings)
            .map(|(text, embedding)| VectorRecord {
                id: embedding_id(&embedding),
                embedding,
                text: text.clone(),
            })
            .collect();

        let (batches, failed_batches) =
            upsert_in_batches(self.index.as_ref(), &records, self.upsert_batch_size).await;

        let report = RefreshReport {
            sentences: sentences.len(),
            records: records.len(),
            batches,
            failed_batches,
            completed_at: Utc::now(),
        };
        tracing::info!(
            sentences = report.sentences,
            records = report.records,
            batches = report.batches,
            failed_batches = report.failed_batches,
            "refresh cycle complete"
        );
        report
    }

    /// Build the answer context for an utterance: embed it, query the index
    /// for the nearest records, and join their texts line by line. Any
    /// failure degrades to an empty context.
    pub async fn retrieve_context(&self, utterance: &str) -> String {
        let inputs = vec![utterance.to_string()];
        let query_vector = match self.embedder.embed(&inputs).await {
            Ok(embeddings) => match embeddings.into_iter().next() {
                Some(vector) => vector,
                None => return String::new(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "embedding service unavailable; no retrieval context");
                return String::new();
            }
        };

        match self.index.query(&query_vector, self.retrieval_top_k).await {
            Ok(matches) => matches
                .iter()
                .map(|m| m.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => {
                tracing::warn!(error = %e, "vector index query failed; no retrieval context");
                String::new()
            }
        }
    }
}

fn empty_report() -> RefreshReport {
    RefreshReport {
        sentences: 0,
        records: 0,
        batches: 0,
        failed_batches: 0,
        completed_at: Utc::now(),
    }
}
