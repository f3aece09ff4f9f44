//! Transactional email delivery.
//!
//! SMTP via lettre. Plain-text bodies only. The service is optional at the
//! application level; callers treat a missing service as "delivery disabled"
//! and a send failure as non-fatal.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::models::Order;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for transactional sends.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a one-time code for order tracking.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or sent.
    pub async fn send_otp_code(&self, to: &str, code: &str) -> Result<(), EmailError> {
        let body = format!(
            "Your Amara verification code is {code}.\n\n\
             It expires in 5 minutes and can be used once. If you did not\n\
             request this code, you can ignore this email.\n"
        );
        self.send(to, "Your Amara verification code", &body).await
    }

    /// Send an order confirmation with a line-item summary.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or sent.
    pub async fn send_order_confirmation(&self, to: &str, order: &Order) -> Result<(), EmailError> {
        let body = order_confirmation_body(order);
        self.send(to, &format!("Order confirmed: {}", order.id), &body)
            .await
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

/// Build the plain-text order confirmation body.
fn order_confirmation_body(order: &Order) -> String {
    let mut body = format!(
        "Thank you for your order!\n\nOrder {}\nStatus: {}\n\nItems:\n",
        order.id, order.status
    );
    for item in &order.items {
        body.push_str(&format!(
            "  {} x{} — {}\n",
            item.name,
            item.quantity,
            item.line_total()
        ));
    }
    body.push_str(&format!("\nTotal: {}\n", order.total));
    body
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use amara_core::{Money, OrderId, OrderStatus};
    use chrono::Utc;

    use crate::models::OrderItem;

    #[test]
    fn test_order_confirmation_body_lists_items_and_total() {
        let order = Order {
            id: OrderId::generate(),
            customer_name: "Asha Rao".to_string(),
            customer_email: "buyer@example.com".to_string(),
            customer_phone: "+911234567890".to_string(),
            items: vec![
                OrderItem {
                    product_id: amara_core::ProductId::generate(),
                    name: "Linen Wrap Dress".to_string(),
                    price: Money::from_minor(149_900),
                    quantity: 2,
                },
                OrderItem {
                    product_id: amara_core::ProductId::generate(),
                    name: "Silk Scarf".to_string(),
                    price: Money::from_minor(49_900),
                    quantity: 1,
                },
            ],
            total: Money::from_minor(349_700),
            status: OrderStatus::Pending,
            shipping_address: "14 Rose Lane, Jaipur".to_string(),
            gateway_order_id: None,
            payment_id: None,
            courier: None,
            tracking_code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let body = order_confirmation_body(&order);
        assert!(body.contains("Linen Wrap Dress x2"));
        assert!(body.contains("Silk Scarf x1"));
        assert!(body.contains("Total: 3497.00"));
        assert!(body.contains("Status: pending"));
    }
}
