use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use apify_client::ApifyClient;
use transcript_client::TranscriptClient;
use vidscout_common::Config;
use vidscout_research::adapters::ApifyCandidateSource;
use vidscout_research::{CandidateSource, InsightExtractor, Researcher};

mod rest;

pub struct AppState {
    pub researcher: Researcher,
}

/// Every route, mounted at the root and again under `/api`.
fn router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/health", get(rest::health))
        .route("/research", post(rest::research))
        .route("/chat", post(rest::chat))
        .route("/chat/suggestions", post(rest::suggestions));

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path only
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }),
        )
}

fn build_researcher(config: &Config) -> Result<Researcher> {
    let candidates: Option<Arc<dyn CandidateSource>> = match &config.apify_token {
        Some(token) => Some(Arc::new(ApifyCandidateSource::new(ApifyClient::new(token.clone())))),
        None => {
            warn!("APIFY_TOKEN not set; research requests will fail until it is configured");
            None
        }
    };

    let extractor: Option<Arc<dyn InsightExtractor>> = match &config.openai_api_key {
        Some(key) => Some(Arc::new(OpenAi::new(key.clone(), config.openai_model.clone()))),
        None => {
            warn!("OPENAI_API_KEY not set; insights and chat are disabled");
            None
        }
    };

    let transcripts = Arc::new(TranscriptClient::new(&config.transcript_api_url)?);

    Ok(Researcher::new(candidates, transcripts, extractor).with_default_pages(config.crawl_pages_default))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("vidscout=info".parse()?)
                .add_directive("api=info".parse()?)
                .add_directive("apify_client=info".parse()?)
                .add_directive("transcript_client=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    info!(?config, "Loaded configuration");

    let state = Arc::new(AppState {
        researcher: build_researcher(&config)?,
    });
    let app = router(state);

    let addr = config.bind_addr();
    info!("Research API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
