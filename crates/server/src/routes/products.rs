//! Catalog route handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use amara_core::ProductId;

use crate::db::{NewProduct, ProductRepository, ProductUpdate};
use crate::error::Result;
use crate::models::Product;
use crate::state::AppState;

/// Admin upsert payload. A present `id` means update, otherwise create.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UpsertProduct {
    Update(ProductUpdate),
    Create(NewProduct),
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    id: Option<ProductId>,
}

/// `GET /api/products` — the full catalog.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(Json(products))
}

/// `POST /api/products` — admin create-or-update.
#[instrument(skip(state, payload))]
pub async fn upsert(
    State(state): State<AppState>,
    Json(payload): Json<UpsertProduct>,
) -> Result<Json<serde_json::Value>> {
    let repo = ProductRepository::new(state.pool());
    let product = match payload {
        UpsertProduct::Update(update) => {
            let product = repo.update(&update).await?;
            state.product_cache().invalidate(&product.id).await;
            product
        }
        UpsertProduct::Create(new) => repo.create(&new).await?,
    };

    Ok(Json(json!({ "success": true, "product": product })))
}

/// `DELETE /api/products?id=` — admin delete. A missing id is a client error
/// with a fixed body, not a validation rejection.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Query(params): Query<DeleteParams>,
) -> Result<Response> {
    let Some(id) = params.id else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "ID required" })),
        )
            .into_response());
    };

    ProductRepository::new(state.pool()).delete(id).await?;
    state.product_cache().invalidate(&id).await;

    Ok(Json(json!({ "success": true })).into_response())
}
