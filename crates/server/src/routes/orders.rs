//! Order route handlers: checkout, admin management, OTP-gated tracking.

use std::collections::HashMap;

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use amara_core::{
    Email, Money, OrderId, OrderStatus, ProductId,
    cart::{MAX_LINE_QUANTITY, SavedLine},
};

use crate::db::{NewOrder, OrderRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::{Order, OrderItem};
use crate::state::AppState;

/// How the customer intends to pay.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMethod {
    /// Out-of-band settlement (WhatsApp, bank transfer). Order is `Placed`.
    #[default]
    #[serde(alias = "whatsapp")]
    Manual,
    /// Online payment through the gateway. Order stays `Pending` until the
    /// payment is verified.
    Gateway,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    pub shipping_address: String,
    pub items: Vec<SavedLine>,
    #[serde(default)]
    pub method: CheckoutMethod,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub email: String,
    pub code: String,
}

/// `POST /api/orders` — checkout.
///
/// Line items are snapshotted from the live catalog (client prices are never
/// trusted) and stock is decremented in the same transaction as the order
/// insert, so a concurrent checkout cannot oversell and a failed line rolls
/// every decrement back. Manual checkout creates the order as `Placed`;
/// gateway checkout leaves it `Pending` until payment verification.
#[instrument(skip(state, request), fields(lines = request.items.len()))]
pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<Order>> {
    let email = Email::parse(&request.customer_email)
        .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))?;
    if request.customer_name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if request.shipping_address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "shipping address is required".to_string(),
        ));
    }
    if request.items.is_empty() || request.items.iter().all(|line| line.quantity == 0) {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }

    let items = snapshot_items(&state, &request.items).await?;
    let total = items
        .iter()
        .fold(Money::ZERO, |acc, item| acc + item.line_total());

    let status = match request.method {
        CheckoutMethod::Manual => OrderStatus::Placed,
        CheckoutMethod::Gateway => OrderStatus::Pending,
    };

    let order = OrderRepository::new(state.pool())
        .create(&NewOrder {
            customer_name: request.customer_name.trim().to_string(),
            customer_email: email.into_inner(),
            customer_phone: request.customer_phone.trim().to_string(),
            shipping_address: request.shipping_address.trim().to_string(),
            items,
            total,
            status,
        })
        .await?;

    // Cached snapshots carry stock counts that just changed
    for item in &order.items {
        state.product_cache().invalidate(&item.product_id).await;
    }

    // Confirmation email is best-effort; checkout has already committed
    if let Some(email_service) = state.email()
        && let Err(e) = email_service
            .send_order_confirmation(&order.customer_email, &order)
            .await
    {
        tracing::warn!(order_id = %order.id, error = %e, "Order confirmation email failed");
    }

    Ok(Json(order))
}

/// `GET /api/admin/orders` — all orders, newest first.
#[instrument(skip(state))]
pub async fn admin_index(State(state): State<AppState>) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list().await?;
    Ok(Json(orders))
}

/// `POST /api/admin/orders/status` — overwrite an order's status.
///
/// Admin transitions are deliberately unconstrained (last writer wins);
/// transition discipline applies only to the webhook paths.
#[instrument(skip(state))]
pub async fn admin_update_status(
    State(state): State<AppState>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .update_status(request.order_id, request.status)
        .await?;

    tracing::info!(order_id = %order.id, status = %order.status, "Admin status update");
    Ok(Json(order))
}

/// `POST /api/orders/track` — OTP-verified order lookup by email.
///
/// The error message never distinguishes a wrong code from an unknown email.
#[instrument(skip(state, request))]
pub async fn track(
    State(state): State<AppState>,
    Json(request): Json<TrackRequest>,
) -> Result<Json<serde_json::Value>> {
    if !state.otp().verify(&request.email, &request.code).await {
        return Err(AppError::Unauthorized(
            "invalid or expired code".to_string(),
        ));
    }

    let orders = OrderRepository::new(state.pool())
        .list_by_email(&request.email.trim().to_lowercase())
        .await?;

    Ok(Json(json!({ "orders": orders })))
}

/// Resolve saved pairs into order line items at live catalog prices.
///
/// Unknown products fail the checkout rather than being dropped: unlike cart
/// rehydration, an order must not silently shrink.
async fn snapshot_items(state: &AppState, lines: &[SavedLine]) -> Result<Vec<OrderItem>> {
    let quantities = merge_quantities(lines)?;
    let ids: Vec<_> = quantities.keys().copied().collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;

    if products.len() != ids.len() {
        return Err(AppError::BadRequest(
            "cart contains unavailable products".to_string(),
        ));
    }

    Ok(products
        .into_iter()
        .map(|product| {
            let quantity = quantities.get(&product.id).copied().unwrap_or(0);
            OrderItem {
                product_id: product.id,
                name: product.name,
                price: product.price,
                quantity,
            }
        })
        .collect())
}

/// Merge duplicate pairs and bound the per-product quantity.
///
/// Quantities are client-supplied; anything past [`MAX_LINE_QUANTITY`] is
/// rejected before any arithmetic or database bind sees it. Accumulation
/// saturates so even adversarial duplicate pairs cannot overflow.
fn merge_quantities(lines: &[SavedLine]) -> Result<HashMap<ProductId, u32>> {
    let mut quantities: HashMap<ProductId, u32> = HashMap::new();
    for line in lines {
        if line.quantity == 0 {
            continue;
        }
        let merged = quantities.entry(line.product_id).or_default();
        *merged = merged.saturating_add(line.quantity);
        if *merged > MAX_LINE_QUANTITY {
            return Err(AppError::BadRequest(format!(
                "quantity for product {} exceeds the maximum of {MAX_LINE_QUANTITY}",
                line.product_id
            )));
        }
    }
    Ok(quantities)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product_id: ProductId, quantity: u32) -> SavedLine {
        SavedLine {
            product_id,
            quantity,
        }
    }

    #[test]
    fn test_merge_quantities_accumulates_duplicates() {
        let id = ProductId::generate();
        let merged = merge_quantities(&[line(id, 2), line(id, 3)]).unwrap();
        assert_eq!(merged.get(&id), Some(&5));
    }

    #[test]
    fn test_merge_quantities_skips_zero_lines() {
        let id = ProductId::generate();
        let merged = merge_quantities(&[line(id, 0), line(id, 4)]).unwrap();
        assert_eq!(merged.get(&id), Some(&4));
    }

    #[test]
    fn test_merge_quantities_rejects_wrapping_quantity() {
        // 3_000_000_000 would turn negative under a plain i32 cast and
        // flip the stock decrement into an increase
        let err = merge_quantities(&[line(ProductId::generate(), 3_000_000_000)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_merge_quantities_rejects_oversized_merge_without_overflow() {
        let id = ProductId::generate();
        let err = merge_quantities(&[line(id, u32::MAX), line(id, 2)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_merge_quantities_accepts_cap_exactly() {
        let id = ProductId::generate();
        let merged = merge_quantities(&[line(id, MAX_LINE_QUANTITY)]).unwrap();
        assert_eq!(merged.get(&id), Some(&MAX_LINE_QUANTITY));
    }
}
