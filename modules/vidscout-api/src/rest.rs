use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::warn;

use vidscout_common::{
    Analysis, ChatAnswer, ChatTurn, CriteriaInput, ResearchError, ResearchResult, ScoredCandidate,
    Transcript,
};
use vidscout_research::chat;

use crate::AppState;

// --- Request bodies ---

#[derive(Deserialize)]
pub struct ResearchRequest {
    query: Option<String>,
    #[serde(default)]
    criteria: CriteriaInput,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    question: Option<String>,
    transcripts: Option<Vec<Transcript>>,
    items: Option<Vec<ScoredCandidate>>,
    #[serde(default, rename = "chatHistory", alias = "chat_history")]
    chat_history: Vec<ChatTurn>,
    #[serde(default)]
    insights: Analysis,
}

/// `items` may be sent too; suggestions don't read it.
#[derive(Deserialize)]
pub struct SuggestionsRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    insights: Analysis,
}

// --- Errors ---

pub struct AppError(ResearchError);

impl From<ResearchError> for AppError {
    fn from(err: ResearchError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            ResearchError::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            ResearchError::ExtractorUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "Language model unavailable")
            }
            ResearchError::NoCandidates(_) => (StatusCode::INTERNAL_SERVER_ERROR, "No videos found"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Request failed"),
        };
        if !self.0.is_client_error() {
            warn!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(serde_json::json!({ "error": error, "message": self.0.to_string() })),
        )
            .into_response()
    }
}

// --- Handlers ---

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn research(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResearchRequest>,
) -> Result<Json<ResearchResult>, AppError> {
    let query = body
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ResearchError::Validation("query is required".into()))?;

    let result = state.researcher.research(&query, body.criteria).await?;
    Ok(Json(result))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatAnswer>, AppError> {
    let question = body
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ResearchError::Validation("question is required".into()))?;
    let (Some(transcripts), Some(items)) = (body.transcripts, body.items) else {
        return Err(ResearchError::Validation("research data (transcripts and items) is required".into()).into());
    };

    let reply = chat::answer(
        state.researcher.extractor(),
        &question,
        &transcripts,
        &items,
        &body.chat_history,
        &body.insights,
    )
    .await?;
    Ok(Json(reply))
}

pub async fn suggestions(Json(body): Json<SuggestionsRequest>) -> Json<serde_json::Value> {
    let suggestions = chat::suggest_questions(&body.query, &body.insights);
    Json(serde_json::json!({ "suggestions": suggestions }))
}
