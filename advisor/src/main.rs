use std::sync::Arc;

use axum::http::{header, Method};
use ractor::Actor;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use advisor::actors::{KnowledgeActor, KnowledgeArguments};
use advisor::api;
use advisor::app_state::AppState;
use advisor::completion::{CompletionProvider, OpenRouterClient};
use advisor::config::Config;
use advisor::knowledge::embedder::embedder_from_config;
use advisor::knowledge::listings::listing_http_client;
use advisor::knowledge::{KnowledgePipeline, PineconeIndex, RefreshGate, VectorIndex};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // .env values are loaded inside Config::from_env so provider keys are
    // available before any client is built.
    let config = Config::from_env().expect("invalid configuration");

    tracing::info!("Starting Pathway Advisor API Server");

    let embedder = embedder_from_config(&config).expect("Failed to build embedder");
    let index: Arc<dyn VectorIndex> = Arc::new(
        PineconeIndex::new(
            &config.index_host,
            config.index_api_key.clone(),
            config.request_timeout,
        )
        .expect("Failed to build vector index client"),
    );
    let completion: Arc<dyn CompletionProvider> = Arc::new(
        OpenRouterClient::new(
            &config.completion_base_url,
            &config.completion_model,
            config.completion_api_key.clone(),
            config.request_timeout,
        )
        .expect("Failed to build completion client"),
    );

    let pipeline = KnowledgePipeline::new(
        embedder,
        index,
        listing_http_client(config.request_timeout).expect("Failed to build listing client"),
        RefreshGate::new(
            config.trigger_statements.clone(),
            config.similarity_threshold,
        ),
        config.listing_url.clone(),
        config.upsert_batch_size,
        config.retrieval_top_k,
    );

    let (knowledge, _handle) = Actor::spawn(
        Some("knowledge.default".to_string()),
        KnowledgeActor,
        KnowledgeArguments { pipeline },
    )
    .await
    .expect("Failed to spawn KnowledgeActor");

    let app_state = AppState::new(knowledge, completion);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let app = api::router().with_state(app_state).layer(cors);

    tracing::info!(port = config.port, "Starting HTTP server");
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    axum::serve(listener, app).await
}
