//! KnowledgeActor and pipeline integration tests.
//!
//! All tests run with the deterministic stub embedder and an in-memory
//! vector index fake, so they never need network access or credentials. The
//! one exception serves the listing fixture from a local HTTP listener to
//! exercise the full fetch → parse → embed → upsert → retrieve loop.
//!
//! Covered:
//!   ✓ refresh_from_document ingests one record per open row, ids are
//!     content-addressed SHA-256 hex
//!   ✓ re-ingesting the same document is idempotent (same ids, same count)
//!   ✓ records are upserted in fixed-size sequential batches
//!   ✓ a failing index degrades the cycle without aborting it
//!   ✓ gate stays closed for unrelated utterances; nothing is written
//!   ✓ a triggered refresh with an unreachable source degrades gracefully
//!   ✓ a triggered turn refreshes before its retrieval (freshness guarantee)
//!   ✓ retrieval returns newline-joined texts, best match first

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::routing::get;
use ractor::Actor;

use advisor::actors::{KnowledgeActor, KnowledgeArguments, KnowledgeMsg};
use advisor::knowledge::{
    cosine_similarity, KnowledgeError, KnowledgePipeline, RefreshGate, StubEmbedder, VectorIndex,
};
use shared_types::{RetrievedMatch, VectorRecord};

// ─── Fixtures ────────────────────────────────────────────────────────────────

const LISTING_DOC: &str = "\
# Summer Internships

| Company | Role | Location | Application/Link | Date Posted |
| ------- | ---- | -------- | ---------------- | ----------- |
| **[Foo](https://foo.example)** | Backend Intern | Remote</br>NYC | \u{2705} | Jan 5 |
| \u{21b3} | Frontend Intern | Remote | \u{2705} | Jan 6 |
| Globex | Data Intern | Chicago | \u{1f512} | Jan 7 |
| Initech | Platform Intern \u{1f6c2} | Austin | \u{2705} | Jan 8 |

<!-- Please leave a one line gap between this and the table TABLE_END (DO NOT CHANGE THIS LINE) -->
";

/// Open rows in LISTING_DOC, in document order.
const EXPECTED_SENTENCES: &[&str] = &[
    "Foo offered an internship titled 'Backend Intern' in Remote and NYC on Jan 5",
    "Foo offered an internship titled 'Frontend Intern' in Remote on Jan 6",
    "Initech offered an internship titled 'Platform Intern' in Austin on Jan 8",
];

fn trigger_statements() -> Vec<String> {
    vec![
        "Are there any new internship opportunities available right now?".to_string(),
        "What are the recent internships in the tech industry?".to_string(),
    ]
}

// ─── Fakes ───────────────────────────────────────────────────────────────────

/// Keyed in-memory stand-in for the external vector index.
#[derive(Default)]
struct InMemoryIndex {
    records: Mutex<HashMap<String, VectorRecord>>,
}

impl InMemoryIndex {
    fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), KnowledgeError> {
        let mut guard = self.records.lock().unwrap();
        for record in records {
            guard.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedMatch>, KnowledgeError> {
        let guard = self.records.lock().unwrap();
        let mut hits: Vec<RetrievedMatch> = guard
            .values()
            .map(|record| RetrievedMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.embedding).unwrap_or(-1.0),
                text: record.text.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }
}

/// Index whose writes always fail — for degradation tests.
struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn upsert(&self, _records: &[VectorRecord]) -> Result<(), KnowledgeError> {
        Err(KnowledgeError::Transport {
            service: "vector index",
            detail: "injected failure".to_string(),
        })
    }

    async fn query(
        &self,
        _vector: &[f32],
        _top_k: usize,
    ) -> Result<Vec<RetrievedMatch>, KnowledgeError> {
        Err(KnowledgeError::Transport {
            service: "vector index",
            detail: "injected failure".to_string(),
        })
    }
}

fn make_pipeline(
    index: Arc<dyn VectorIndex>,
    listing_url: &str,
    batch_size: usize,
) -> KnowledgePipeline {
    KnowledgePipeline::new(
        Arc::new(StubEmbedder),
        index,
        reqwest::Client::new(),
        RefreshGate::new(trigger_statements(), 0.8),
        listing_url.to_string(),
        batch_size,
        10,
    )
}

/// Serve `LISTING_DOC` from an ephemeral local port.
async fn serve_listing_doc() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fixture listener");
    let addr = listener.local_addr().expect("fixture addr");
    let app = axum::Router::new().route("/listing.md", get(|| async { LISTING_DOC }));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fixture server");
    });
    format!("http://{addr}/listing.md")
}

// ─── Pipeline tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_ingests_one_record_per_open_row() {
    let index = Arc::new(InMemoryIndex::default());
    let pipeline = make_pipeline(index.clone(), "http://unused.invalid/", 25);

    let report = pipeline.refresh_from_document(LISTING_DOC).await;

    assert_eq!(report.sentences, EXPECTED_SENTENCES.len());
    assert_eq!(report.records, EXPECTED_SENTENCES.len());
    assert_eq!(report.batches, 1);
    assert_eq!(report.failed_batches, 0);
    assert_eq!(index.len(), EXPECTED_SENTENCES.len());

    for id in index.ids() {
        assert_eq!(id.len(), 64, "content-addressed ids are SHA-256 hex");
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

#[tokio::test]
async fn test_reingesting_identical_document_is_idempotent() {
    let index = Arc::new(InMemoryIndex::default());
    let pipeline = make_pipeline(index.clone(), "http://unused.invalid/", 25);

    let first = pipeline.refresh_from_document(LISTING_DOC).await;
    let ids_after_first = index.ids();

    let second = pipeline.refresh_from_document(LISTING_DOC).await;

    assert_eq!(first.records, second.records);
    assert_eq!(index.ids(), ids_after_first, "same content → same ids → overwrite");
    assert_eq!(index.len(), EXPECTED_SENTENCES.len());
}

#[tokio::test]
async fn test_records_are_upserted_in_fixed_size_batches() {
    let index = Arc::new(InMemoryIndex::default());
    let pipeline = make_pipeline(index.clone(), "http://unused.invalid/", 2);

    let report = pipeline.refresh_from_document(LISTING_DOC).await;

    // 3 records at batch size 2 → 2 batches.
    assert_eq!(report.records, 3);
    assert_eq!(report.batches, 2);
    assert_eq!(report.failed_batches, 0);
    assert_eq!(index.len(), 3);
}

#[tokio::test]
async fn test_failing_index_degrades_without_aborting() {
    let pipeline = make_pipeline(Arc::new(FailingIndex), "http://unused.invalid/", 1);

    let report = pipeline.refresh_from_document(LISTING_DOC).await;

    // Every batch fails, every batch is still attempted.
    assert_eq!(report.batches, 3);
    assert_eq!(report.failed_batches, 3);
}

#[tokio::test]
async fn test_retrieval_on_failing_index_is_empty_context() {
    let pipeline = make_pipeline(Arc::new(FailingIndex), "http://unused.invalid/", 25);
    let context = pipeline.retrieve_context("any question").await;
    assert!(context.is_empty());
}

// ─── Actor tests ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_gate_stays_closed_for_unrelated_utterance() {
    let index = Arc::new(InMemoryIndex::default());
    let pipeline = make_pipeline(index.clone(), "http://127.0.0.1:9/listing.md", 25);

    let (knowledge, _handle) = Actor::spawn(None, KnowledgeActor, KnowledgeArguments { pipeline })
        .await
        .expect("knowledge actor spawn");

    let outcome = ractor::call!(knowledge, |reply| KnowledgeMsg::MaybeRefresh {
        utterance: "What's the weather?".to_string(),
        reply,
    })
    .expect("gate rpc");

    assert!(!outcome.triggered);
    assert!(outcome.report.is_none());
    assert_eq!(index.len(), 0, "closed gate must not write anything");

    knowledge.stop(None);
}

#[tokio::test]
async fn test_triggered_refresh_with_unreachable_source_degrades() {
    let index = Arc::new(InMemoryIndex::default());
    // Nothing listens on the discard port; the fetch fails fast.
    let pipeline = make_pipeline(index.clone(), "http://127.0.0.1:9/listing.md", 25);

    let (knowledge, _handle) = Actor::spawn(None, KnowledgeActor, KnowledgeArguments { pipeline })
        .await
        .expect("knowledge actor spawn");

    let outcome = ractor::call!(knowledge, |reply| KnowledgeMsg::MaybeRefresh {
        utterance: "What are the recent internships in the tech industry?".to_string(),
        reply,
    })
    .expect("gate rpc");

    assert!(outcome.triggered, "identical trigger phrase must fire the gate");
    let report = outcome.report.expect("triggered turn carries a report");
    assert_eq!(report.sentences, 0);
    assert_eq!(report.records, 0);
    assert_eq!(index.len(), 0);

    knowledge.stop(None);
}

#[tokio::test]
async fn test_triggered_turn_refreshes_before_retrieval() {
    let index = Arc::new(InMemoryIndex::default());
    let listing_url = serve_listing_doc().await;
    let pipeline = make_pipeline(index.clone(), &listing_url, 25);

    let (knowledge, _handle) = Actor::spawn(None, KnowledgeActor, KnowledgeArguments { pipeline })
        .await
        .expect("knowledge actor spawn");

    let outcome = ractor::call!(knowledge, |reply| KnowledgeMsg::MaybeRefresh {
        utterance: "Are there any new internship opportunities available right now?".to_string(),
        reply,
    })
    .expect("gate rpc");

    assert!(outcome.triggered);
    let report = outcome.report.expect("report");
    assert_eq!(report.records, EXPECTED_SENTENCES.len());
    assert_eq!(report.failed_batches, 0);

    // The same turn's retrieval sees data at least as fresh as the refresh.
    let context = ractor::call!(knowledge, |reply| KnowledgeMsg::RetrieveContext {
        utterance: "Are there any new internship opportunities available right now?".to_string(),
        reply,
    })
    .expect("retrieve rpc");

    for sentence in EXPECTED_SENTENCES {
        assert!(context.contains(sentence), "missing from context: {sentence}");
    }

    knowledge.stop(None);
}

#[tokio::test]
async fn test_retrieval_ranks_exact_match_first_and_joins_with_newlines() {
    let index = Arc::new(InMemoryIndex::default());
    let pipeline = make_pipeline(index.clone(), "http://unused.invalid/", 25);
    pipeline.refresh_from_document(LISTING_DOC).await;

    let (knowledge, _handle) = Actor::spawn(None, KnowledgeActor, KnowledgeArguments { pipeline })
        .await
        .expect("knowledge actor spawn");

    // Query with the exact text of one stored sentence: the stub embedder
    // maps identical strings to identical vectors, so it must rank first.
    let target = EXPECTED_SENTENCES[2];
    let context = ractor::call!(knowledge, |reply| KnowledgeMsg::RetrieveContext {
        utterance: target.to_string(),
        reply,
    })
    .expect("retrieve rpc");

    let lines: Vec<&str> = context.lines().collect();
    assert_eq!(lines.len(), EXPECTED_SENTENCES.len());
    assert_eq!(lines[0], target);

    knowledge.stop(None);
}

#[tokio::test]
async fn test_retrieval_on_empty_index_is_empty() {
    let index = Arc::new(InMemoryIndex::default());
    let pipeline = make_pipeline(index, "http://unused.invalid/", 25);

    let (knowledge, _handle) = Actor::spawn(None, KnowledgeActor, KnowledgeArguments { pipeline })
        .await
        .expect("knowledge actor spawn");

    let context = ractor::call!(knowledge, |reply| KnowledgeMsg::RetrieveContext {
        utterance: "anything".to_string(),
        reply,
    })
    .expect("retrieve rpc");

    assert!(context.is_empty());

    knowledge.stop(None);
}
