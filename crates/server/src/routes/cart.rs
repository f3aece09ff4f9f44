//! Cart rehydration handler.
//!
//! The cart itself lives on the client; the server's only cart concern is
//! resolving persisted `(product_id, quantity)` pairs back into full lines
//! against the live catalog.

use std::collections::HashMap;

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use amara_core::{
    ProductId,
    cart::{Cart, MAX_LINE_QUANTITY, ProductSnapshot, SavedLine},
};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HydratedCart {
    pub cart: Cart,
    pub item_count: u32,
    pub subtotal: amara_core::Money,
}

/// `POST /api/cart/hydrate` — resolve saved pairs into full cart lines.
///
/// Snapshots come from the product cache first, then the database for
/// misses. Pairs that resolve to nothing are silently dropped; pairs with a
/// quantity past the cap are malformed input and rejected outright.
#[instrument(skip(state, saved), fields(pairs = saved.len()))]
pub async fn hydrate(
    State(state): State<AppState>,
    Json(saved): Json<Vec<SavedLine>>,
) -> Result<Json<HydratedCart>> {
    if saved.iter().any(|pair| pair.quantity > MAX_LINE_QUANTITY) {
        return Err(AppError::BadRequest(format!(
            "line quantity exceeds the maximum of {MAX_LINE_QUANTITY}"
        )));
    }

    let snapshots = resolve_snapshots(&state, &saved).await?;
    let cart = Cart::rehydrate(&saved, |id| snapshots.get(&id).cloned());

    Ok(Json(HydratedCart {
        item_count: cart.item_count(),
        subtotal: cart.subtotal(),
        cart,
    }))
}

/// Resolve the distinct product ids in `saved`, cache-first.
async fn resolve_snapshots(
    state: &AppState,
    saved: &[SavedLine],
) -> Result<HashMap<ProductId, ProductSnapshot>> {
    let mut snapshots = HashMap::new();
    let mut misses = Vec::new();

    for pair in saved {
        if snapshots.contains_key(&pair.product_id) || misses.contains(&pair.product_id) {
            continue;
        }
        if let Some(snapshot) = state.product_cache().get(&pair.product_id).await {
            snapshots.insert(pair.product_id, snapshot);
        } else {
            misses.push(pair.product_id);
        }
    }

    if !misses.is_empty() {
        let products = ProductRepository::new(state.pool()).get_many(&misses).await?;
        for product in products {
            let snapshot = product.snapshot();
            state
                .product_cache()
                .insert(product.id, snapshot.clone())
                .await;
            snapshots.insert(product.id, snapshot);
        }
    }

    Ok(snapshots)
}
