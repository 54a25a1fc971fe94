//! Types shared across the advisor service boundaries
//!
//! These types cross three seams:
//! - the HTTP chat API (request/response bodies)
//! - the knowledge actor (refresh outcomes and retrieval matches)
//! - the external vector index (records written and read back)
//!
//! Serializable with serde for JSON over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Chat Types
// ============================================================================

/// Who authored a chat message. Wire format matches the OpenAI-style
/// `{"role": "user", "content": "..."}` shape the completion provider expects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of the conversation as sent by the chat consumer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

// ============================================================================
// Vector Index Types
// ============================================================================

/// Fixed dimension of the sentence embeddings (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// One record written to the external vector index.
///
/// `id` is a pure function of `embedding` (fixed-precision serialization then
/// SHA-256), so re-ingesting identical content overwrites rather than
/// duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
}

/// One nearest-neighbor hit returned by the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedMatch {
    pub id: String,
    pub score: f32,
    pub text: String,
}

// ============================================================================
// Refresh Types
// ============================================================================

/// Summary of one refresh cycle. Batches are best-effort: a failed batch is
/// counted here rather than aborting the cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshReport {
    /// Sentences parsed out of the listing document.
    pub sentences: usize,
    /// Records actually paired with an embedding and queued for upsert.
    pub records: usize,
    /// Total batches issued.
    pub batches: usize,
    /// Batches that failed to upsert.
    pub failed_batches: usize,
    pub completed_at: DateTime<Utc>,
}

/// Result of the per-turn gate check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Whether the similarity gate met the threshold for this utterance.
    pub triggered: bool,
    /// Present only when a refresh actually ran.
    pub report: Option<RefreshReport>,
}

impl RefreshOutcome {
    pub fn skipped() -> Self {
        Self {
            triggered: false,
            report: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
