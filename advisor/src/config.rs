use std::time::Duration;

/// Reference trigger statements: utterances similar enough to one of these
/// mean the user wants fresh listing data.
const DEFAULT_TRIGGER_STATEMENTS: &[&str] = &[
    "Are there any new internship opportunities available right now?",
    "Can you tell me about the latest internship postings?",
    "What are the recent internships in the tech industry?",
    "What are the latest internships for software development?",
    "What internships are currently open for students or recent graduates?",
    "Are there any new internships suitable for college students?",
];

const DEFAULT_LISTING_URL: &str =
    "https://raw.githubusercontent.com/SimplifyJobs/Summer2025-Internships/dev/README.md";

#[derive(Debug, Clone)]
pub struct Config {
    /// Port the advisor API listens on
    pub port: u16,
    /// Base URL of the embedding service
    pub embedding_base_url: String,
    /// Embedding model identifier (384-dim sentence embeddings)
    pub embedding_model: String,
    /// Credential for the embedding service
    pub embedding_api_key: Option<String>,
    /// Host URL of the vector index
    pub index_host: String,
    /// Credential for the vector index
    pub index_api_key: Option<String>,
    /// Cosine similarity threshold for the refresh gate
    pub similarity_threshold: f32,
    /// Reference trigger statements for the refresh gate
    pub trigger_statements: Vec<String>,
    /// URL of the internship listing document
    pub listing_url: String,
    /// Records per vector index upsert batch
    pub upsert_batch_size: usize,
    /// Nearest neighbors fetched for answer context
    pub retrieval_top_k: usize,
    /// Base URL of the completion provider
    pub completion_base_url: String,
    /// Completion model identifier
    pub completion_model: String,
    /// Credential for the completion provider
    pub completion_api_key: Option<String>,
    /// Per-call deadline applied to every external request
    pub request_timeout: Duration,
    /// Use the deterministic offline embedder instead of the live service
    pub stub_embedder: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            port: env_parse("ADVISOR_PORT", 8080)?,
            embedding_base_url: env_str(
                "EMBEDDING_BASE_URL",
                "https://api-inference.huggingface.co",
            ),
            embedding_model: env_str(
                "EMBEDDING_MODEL",
                "sentence-transformers/all-MiniLM-L6-v2",
            ),
            embedding_api_key: std::env::var("HUGGINGFACE_API_KEY").ok(),
            index_host: env_str("PINECONE_INDEX_HOST", ""),
            index_api_key: std::env::var("PINECONE_API_KEY").ok(),
            similarity_threshold: env_parse("ADVISOR_SIMILARITY_THRESHOLD", 0.8f32)?,
            trigger_statements: env_csv("ADVISOR_TRIGGER_STATEMENTS", DEFAULT_TRIGGER_STATEMENTS),
            listing_url: env_str("LISTING_URL", DEFAULT_LISTING_URL),
            upsert_batch_size: env_parse("ADVISOR_UPSERT_BATCH_SIZE", 25usize)?,
            retrieval_top_k: env_parse("ADVISOR_RETRIEVAL_TOP_K", 250usize)?,
            completion_base_url: env_str("OPENROUTER_BASE_URL", "https://openrouter.ai/api/v1"),
            completion_model: env_str(
                "OPENROUTER_MODEL",
                "meta-llama/llama-3.1-8b-instruct:free",
            ),
            completion_api_key: std::env::var("OPENROUTER_API_KEY").ok(),
            request_timeout: Duration::from_millis(env_parse(
                "ADVISOR_REQUEST_TIMEOUT_MS",
                30_000u64,
            )?),
            stub_embedder: env_flag("ADVISOR_EMBED_STUB"),
        })
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        Err(_) => Ok(default),
    }
}

fn env_csv(key: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        Err(_) => default.iter().map(|s| (*s).to_string()).collect(),
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trigger_set_has_six_statements() {
        assert_eq!(DEFAULT_TRIGGER_STATEMENTS.len(), 6);
        assert!(DEFAULT_TRIGGER_STATEMENTS
            .iter()
            .all(|s| !s.trim().is_empty()));
    }
}
