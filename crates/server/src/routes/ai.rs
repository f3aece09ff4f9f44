//! Admin AI content generation handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DescribeRequest {
    pub name: String,
    pub hints: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
}

/// `POST /api/admin/ai/describe` — generate product copy.
#[instrument(skip(state, request), fields(product = %request.name))]
pub async fn describe(
    State(state): State<AppState>,
    Json(request): Json<DescribeRequest>,
) -> Result<Json<serde_json::Value>> {
    let description = state
        .ai()
        .describe(&request.name, request.hints.as_deref())
        .await?;
    Ok(Json(json!({ "description": description })))
}

/// `POST /api/admin/ai/image` — generate a product image.
#[instrument(skip(state, request))]
pub async fn image(
    State(state): State<AppState>,
    Json(request): Json<ImageRequest>,
) -> Result<Json<serde_json::Value>> {
    let generated = state.ai().generate_image(&request.prompt).await?;
    Ok(Json(json!({ "image": generated })))
}
