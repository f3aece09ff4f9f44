//! Shipping quote handler.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::services::shipping::RateQuote;
use crate::state::AppState;

const DEFAULT_WEIGHT_KG: f64 = 0.5;

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub destination_postcode: String,
    #[serde(default = "default_weight")]
    pub weight_kg: f64,
}

const fn default_weight() -> f64 {
    DEFAULT_WEIGHT_KG
}

/// `POST /api/shipping/quote` — cheapest courier for a route.
///
/// Infallible by contract: aggregator failures surface as the fixed
/// fallback rate, never as an error response.
#[instrument(skip(state, request), fields(destination = %request.destination_postcode))]
pub async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<RateQuote>> {
    let quote = state
        .shipping()
        .quote(&request.destination_postcode, request.weight_kg)
        .await;
    Ok(Json(quote))
}
