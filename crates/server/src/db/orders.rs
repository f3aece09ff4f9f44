//! Order repository.

use sqlx::PgPool;

use amara_core::{Money, OrderId, OrderStatus};

use super::{ProductRepository, RepositoryError};
use crate::models::{Order, OrderItem};

/// Data needed to persist a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub status: OrderStatus,
}

const ORDER_COLUMNS: &str = r"id, customer_name, customer_email, customer_phone,
       shipping_address, items, total, status, gateway_order_id, payment_id,
       courier, tracking_code, created_at, updated_at";

/// Repository for customer orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new order, decrementing stock for every line in the same
    /// transaction.
    ///
    /// Nothing commits until every decrement and the order insert have
    /// succeeded: a line that runs out of stock mid-checkout rolls the whole
    /// order back and leaves the catalog untouched, so a client retry starts
    /// from clean state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InsufficientStock` if any line exceeds the
    /// available stock, `RepositoryError::Conflict` if a line quantity does
    /// not fit a database integer, and `RepositoryError::Database` if the
    /// insert fails or the items fail to serialize.
    pub async fn create(&self, new: &NewOrder) -> Result<Order, RepositoryError> {
        let items = serde_json::to_value(&new.items)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        for item in &new.items {
            ProductRepository::decrement_stock(
                &mut tx,
                item.product_id,
                line_quantity(item.quantity)?,
            )
            .await?;
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            INSERT INTO orders (customer_name, customer_email, customer_phone,
                                shipping_address, items, total, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(&new.customer_name)
        .bind(&new.customer_email)
        .bind(&new.customer_phone)
        .bind(&new.shipping_address)
        .bind(items)
        .bind(new.total)
        .bind(new.status.to_string())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// List all orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// List a customer's orders by email, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_email(&self, email: &str) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_email = $1 ORDER BY created_at DESC"
        ))
        .bind(email)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// Find the order associated with a gateway order id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE gateway_order_id = $1"
        ))
        .bind(gateway_order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Overwrite an order's status. Last writer wins; callers that need
    /// transition discipline check `OrderStatus::can_transition_to` first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has the given id.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status.to_string())
        .fetch_optional(self.pool)
        .await?;

        order.ok_or(RepositoryError::NotFound)
    }

    /// Record the gateway order id created for a payment intent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has the given id.
    pub async fn set_gateway_order(
        &self,
        id: OrderId,
        gateway_order_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET gateway_order_id = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(gateway_order_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record a verified payment and the resulting status in one statement,
    /// so a crash cannot leave the payment id attached to an unpaid order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has the given id.
    pub async fn record_payment(
        &self,
        id: OrderId,
        payment_id: &str,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders
            SET payment_id = $2, status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(payment_id)
        .bind(status.to_string())
        .fetch_optional(self.pool)
        .await?;

        order.ok_or(RepositoryError::NotFound)
    }

    /// Attach carrier metadata to an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has the given id.
    pub async fn set_shipment(
        &self,
        id: OrderId,
        courier: Option<&str>,
        tracking_code: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET courier = COALESCE($2, courier),
                tracking_code = COALESCE($3, tracking_code),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(courier)
        .bind(tracking_code)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Convert a line quantity to the `INT` the stock decrement binds.
///
/// A plain `as i32` cast would wrap quantities above `i32::MAX` negative,
/// turning the decrement guard into a stock *increase*; refuse them instead.
fn line_quantity(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("line quantity {quantity} out of range")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_quantity_accepts_sane_values() {
        assert_eq!(line_quantity(1).unwrap(), 1);
        assert_eq!(line_quantity(10_000).unwrap(), 10_000);
    }

    #[test]
    fn test_line_quantity_rejects_wrapping_values() {
        // 3_000_000_000u32 as i32 is negative; the guard `stock >= $2`
        // would then pass unconditionally and inflate stock.
        assert!(line_quantity(3_000_000_000).is_err());
        assert!(line_quantity(u32::MAX).is_err());
    }
}
