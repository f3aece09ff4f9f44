//! Payment intent and verification handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use amara_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    pub order_id: OrderId,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub order_id: OrderId,
    pub payment_id: String,
    pub signature: String,
}

/// `POST /api/payments/intent` — register an order with the gateway.
///
/// Returns the gateway order id plus the public key id the client needs to
/// open the payment widget.
#[instrument(skip(state))]
pub async fn intent(
    State(state): State<AppState>,
    Json(request): Json<IntentRequest>,
) -> Result<Json<serde_json::Value>> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(request.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(request.order_id.to_string()))?;

    if order.status != OrderStatus::Pending {
        return Err(AppError::BadRequest(format!(
            "order is {} and cannot be paid",
            order.status
        )));
    }

    let gateway_order = state
        .payments()
        .create_order(order.total, &order.id.to_string())
        .await?;
    repo.set_gateway_order(order.id, &gateway_order.id).await?;

    Ok(Json(json!({
        "gateway_order_id": gateway_order.id,
        "amount": gateway_order.amount,
        "currency": gateway_order.currency,
        "key_id": state.payments().key_id(),
    })))
}

/// `POST /api/payments/verify` — verify a payment signature and mark the
/// order `Paid`.
///
/// This is the only client-facing transition into `Paid`, and it is gated on
/// the HMAC check. A mismatch is a hard 401 with no state change.
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<serde_json::Value>> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(request.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(request.order_id.to_string()))?;

    let gateway_order_id = order
        .gateway_order_id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("order has no payment intent".to_string()))?;

    if !state
        .payments()
        .verify_signature(gateway_order_id, &request.payment_id, &request.signature)
    {
        tracing::warn!(order_id = %order.id, "Payment signature mismatch");
        return Err(AppError::Unauthorized(
            "payment signature mismatch".to_string(),
        ));
    }

    if !order.status.can_transition_to(OrderStatus::Paid) {
        return Err(AppError::BadRequest(format!(
            "order is {} and cannot transition to paid",
            order.status
        )));
    }

    let order = repo
        .record_payment(order.id, &request.payment_id, OrderStatus::Paid)
        .await?;

    Ok(Json(json!({ "success": true, "status": order.status })))
}
