//! Cosine similarity and the refresh gate.

use crate::knowledge::{KnowledgeError, TextEmbedder};

/// Cosine similarity between two vectors, in [-1, 1].
///
/// Returns `None` when the value is undefined: mismatched lengths, empty
/// vectors, or a zero-magnitude operand. Callers must fail closed on `None`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    Some((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}

/// Decides whether a user utterance warrants refreshing the knowledge base.
///
/// The utterance is compared against a fixed set of reference trigger
/// phrases; the maximum cosine similarity must meet the threshold. Any
/// failure along the way (embedder unavailable, misaligned response,
/// undefined similarity) keeps the gate closed.
pub struct RefreshGate {
    triggers: Vec<String>,
    threshold: f32,
}

impl RefreshGate {
    pub fn new(triggers: Vec<String>, threshold: f32) -> Self {
        Self {
            triggers,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// One batched embedding call covers the K triggers plus the utterance.
    pub async fn should_refresh(&self, embedder: &dyn TextEmbedder, utterance: &str) -> bool {
        if self.triggers.is_empty() {
            return false;
        }

        let mut inputs = self.triggers.clone();
        inputs.push(utterance.to_string());

        let embeddings = match embedder.embed(&inputs).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                log_unavailable(&e);
                return false;
            }
        };
        if embeddings.len() != inputs.len() {
            tracing::warn!(
                expected = inputs.len(),
                got = embeddings.len(),
                "embedding batch misaligned; gate stays closed"
            );
            return false;
        }

        let (trigger_vecs, rest) = embeddings.split_at(self.triggers.len());
        let user_vec = &rest[0];

        let best = trigger_vecs
            .iter()
            .filter_map(|t| cosine_similarity(user_vec, t))
            .fold(f32::NEG_INFINITY, f32::max);

        best >= self.threshold
    }
}

fn log_unavailable(err: &KnowledgeError) {
    tracing::warn!(error = %err, "embedding service unavailable; gate stays closed");
}
