//! Knowledge refresh pipeline.
//!
//! The advisor's internship knowledge lives in an external vector index and
//! is refreshed on demand: when a user's message looks like a request for
//! fresh listings (similarity gate), the current listing document is fetched,
//! parsed into factual sentences, embedded, and upserted under
//! content-addressed identifiers so re-ingesting unchanged facts overwrites
//! instead of duplicating.
//!
//! Every external call here can fail; failures are contained at this module's
//! boundary. The chat turn proceeds degraded (no refresh, empty context) and
//! never sees a panic from this path.

pub mod embedder;
pub mod index;
pub mod listings;
pub mod refresh;
pub mod similarity;

pub use embedder::{HfEmbedder, StubEmbedder, TextEmbedder};
pub use index::{embedding_id, PineconeIndex, VectorIndex};
pub use listings::parse_listing_document;
pub use refresh::KnowledgePipeline;
pub use similarity::{cosine_similarity, RefreshGate};

/// Error type for knowledge operations.
///
/// `Timeout` is deliberately distinct from `Transport`: a stalled provider is
/// reported as a deadline miss, not a generic network failure.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("missing API key: {0}")]
    MissingApiKey(&'static str),

    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    #[error("{service} request failed: {detail}")]
    Transport {
        service: &'static str,
        detail: String,
    },

    #[error("{service} response unusable: {detail}")]
    Parse {
        service: &'static str,
        detail: String,
    },

    #[error("listing document format unrecognized: {0}")]
    Format(String),
}

impl KnowledgeError {
    /// Classify a reqwest failure for `service`.
    pub(crate) fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            KnowledgeError::Timeout { service }
        } else if err.is_decode() {
            KnowledgeError::Parse {
                service,
                detail: err.to_string(),
            }
        } else {
            KnowledgeError::Transport {
                service,
                detail: err.to_string(),
            }
        }
    }
}
