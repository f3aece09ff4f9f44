//! Order model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use amara_core::{Money, OrderId, OrderStatus, ProductId};

/// A line item snapshot inside an order.
///
/// Decoupled from the live `Product` row so the historical price survives
/// later catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
}

impl OrderItem {
    /// Line total at the snapshot price.
    #[must_use]
    pub const fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// A customer order.
///
/// Created at checkout; only the status and payment/shipment metadata mutate
/// afterwards. Orders are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    #[sqlx(json)]
    pub items: Vec<OrderItem>,
    pub total: Money,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    /// Gateway-side order id for online payments.
    pub gateway_order_id: Option<String>,
    /// Gateway-side payment id, recorded on verification.
    pub payment_id: Option<String>,
    pub courier: Option<String>,
    pub tracking_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let item = OrderItem {
            product_id: ProductId::generate(),
            name: "Block Print Scarf".to_string(),
            price: Money::from_minor(89_900),
            quantity: 2,
        };
        assert_eq!(item.line_total(), Money::from_minor(179_800));
    }

    #[test]
    fn test_item_serde_shape() {
        let item = OrderItem {
            product_id: ProductId::generate(),
            name: "Scarf".to_string(),
            price: Money::from_minor(100),
            quantity: 1,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("product_id").is_some());
        assert_eq!(json["price"], 100);
        assert_eq!(json["quantity"], 1);
    }
}
