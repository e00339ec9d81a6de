use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rw_core::{NormalizedArticle, ResultArticle, SearchQuery};
use rw_inference::chat::ToolDefinition;
use rw_reader::SearchArgs;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::AppState;

/// Error body for failed requests: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<rw_core::Error> for ApiError {
    fn from(e: rw_core::Error) -> Self {
        error!("Request failed: {}", e);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub input: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub output: String,
}

/// Same arguments the agent passes to `search_readwise`.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(args): Json<SearchArgs>,
) -> Json<Vec<ResultArticle>> {
    let query: SearchQuery = args.into();
    Json(state.library.search(&query).await)
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<NormalizedArticle>>, ApiError> {
    Ok(Json(state.library.articles().await?))
}

pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Vec<ToolDefinition>> {
    let definitions = match &state.agent {
        Some(agent) => agent.tool_definitions(),
        None => state.tools().iter().map(|t| t.definition()).collect(),
    };
    Json(definitions)
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let Some(agent) = &state.agent else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "No chat model configured",
        ));
    };

    info!("🤖 Agent question: {}", request.input);
    let output = agent.run(&request.input).await?;
    Ok(Json(AskResponse { output }))
}
