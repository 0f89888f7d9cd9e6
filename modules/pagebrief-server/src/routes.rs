use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use pagebrief_common::ChatTurn;
use pagebrief_engine::{Pipeline, PipelineRequest};

pub struct AppState {
    pub pipeline: Pipeline,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api", get(health))
        .route("/api/search", post(search))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

#[derive(Deserialize)]
pub struct SearchBody {
    /// "url" requests discovery; anything else summarizes `urls`.
    #[serde(rename = "type", default)]
    request_type: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    urls: Option<Vec<String>>,
}

/// Validate a search body and map it onto a pipeline request.
///
/// Field checks run in a fixed order so clients see stable error
/// messages: source, then type, then the mode-specific payload field.
fn parse_request(body: SearchBody) -> Result<PipelineRequest, (StatusCode, &'static str)> {
    if body.source != "section" && body.source != "title" {
        return Err((StatusCode::NOT_FOUND, "Source field is required"));
    }
    if body.request_type.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Type field is required"));
    }

    if body.request_type == "url" {
        let Some(title) = body.title.filter(|t| !t.is_empty()) else {
            return Err((StatusCode::BAD_REQUEST, "Title field is required"));
        };
        Ok(PipelineRequest::Discover {
            history: vec![ChatTurn::human(&title)],
            query: title,
        })
    } else {
        let Some(urls) = body.urls else {
            return Err((StatusCode::BAD_REQUEST, "URLS field is required"));
        };
        Ok(PipelineRequest::Summarize { urls })
    }
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchBody>,
) -> impl IntoResponse {
    let request = match parse_request(body) {
        Ok(request) => request,
        Err((status, message)) => {
            return (status, Json(serde_json::json!({ "message": message }))).into_response();
        }
    };

    let output = state.pipeline.run(request).await;
    Json(serde_json::json!({ "data": output })).into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
