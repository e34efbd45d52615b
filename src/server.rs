//! HTTP surface for the recipe generation pipeline.

use crate::ingest;
use crate::models::Recipe;
use crate::pipeline::RecipePipeline;
use crate::{Error, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Shared state for all handlers. The pipeline is only present when a
/// generation credential was configured at startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Option<Arc<RecipePipeline>>,
}

/// Build the application router with CORS, body-limit, and trace layers.
pub fn create_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate-recipe", any(generate_recipe))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Single endpoint dispatched on method: OPTIONS gets an empty 204, POST
/// runs the pipeline, everything else is 405.
async fn generate_recipe(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match method {
        Method::OPTIONS => StatusCode::NO_CONTENT.into_response(),
        Method::POST => match run_pipeline(&state, &headers, &body).await {
            Ok(recipe) => Json(recipe).into_response(),
            Err(err) => {
                tracing::warn!("Request failed: {}", err);
                err.into_response()
            }
        },
        _ => (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(serde_json::json!({ "error": "Method not allowed" })),
        )
            .into_response(),
    }
}

async fn run_pipeline(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<Recipe> {
    // credential presence is checked before any parsing or generation work
    let pipeline = state.pipeline.as_ref().ok_or(Error::MissingCredential)?;
    let form = ingest::parse_request(headers, body).await?;
    pipeline.generate(form).await
}
