//! Payment gateway client.
//!
//! Creates gateway orders for checkout and verifies webhook/callback
//! signatures. Signatures are HMAC-SHA256 over `"{order_id}|{payment_id}"`,
//! hex-encoded, keyed by the webhook secret.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::instrument;

use amara_core::Money;

use crate::config::PaymentConfig;

/// Gateway API base URL.
const API_BASE: &str = "https://api.razorpay.com/v1";

/// Settlement currency for gateway orders.
const CURRENCY: &str = "INR";

type HmacSha256 = Hmac<Sha256>;

/// Errors from the payment gateway API.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway rejected the request: HTTP {status}: {body}")]
    GatewayRejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// An order registered with the gateway, awaiting payment.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
}

/// Payment gateway API client.
#[derive(Clone)]
pub struct PaymentClient {
    inner: Arc<PaymentClientInner>,
}

struct PaymentClientInner {
    client: reqwest::Client,
    key_id: String,
    key_secret: SecretString,
    webhook_secret: SecretString,
}

impl PaymentClient {
    /// Create a client from configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &PaymentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(PaymentClientInner {
                client,
                key_id: config.key_id.clone(),
                key_secret: config.key_secret.clone(),
                webhook_secret: config.webhook_secret.clone(),
            }),
        }
    }

    /// Public key id, safe to expose to the storefront for checkout widgets.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.inner.key_id
    }

    /// Register an order with the gateway.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the request fails or the gateway rejects it.
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        amount: Money,
        receipt: &str,
    ) -> Result<GatewayOrder, PaymentError> {
        #[derive(Serialize)]
        struct CreateOrderRequest<'a> {
            amount: i64,
            currency: &'a str,
            receipt: &'a str,
        }

        let response = self
            .inner
            .client
            .post(format!("{API_BASE}/orders"))
            .basic_auth(
                &self.inner.key_id,
                Some(self.inner.key_secret.expose_secret()),
            )
            .json(&CreateOrderRequest {
                amount: amount.as_minor(),
                currency: CURRENCY,
                receipt,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::GatewayRejected { status, body });
        }

        Ok(response.json().await?)
    }

    /// Verify a payment signature.
    ///
    /// The expected signature is HMAC-SHA256 over `"{order_id}|{payment_id}"`
    /// keyed with the webhook secret, hex-encoded. Any mismatch, including a
    /// single flipped character, returns `false`.
    #[must_use]
    pub fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(
            order_id,
            payment_id,
            signature,
            self.inner.webhook_secret.expose_secret(),
        )
    }
}

/// Verify an HMAC-SHA256 hex signature over `"{order_id}|{payment_id}"`.
fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    signature: &str,
    secret: &str,
) -> bool {
    let message = format!("{order_id}|{payment_id}");

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());

    // Decode the claimed signature and let the MAC do a constant-time check
    let Ok(claimed) = hex::decode(signature) else {
        return false;
    };
    mac.verify_slice(&claimed).is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "test_webhook_secret";

    fn sign(order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let sig = sign("order_abc123", "pay_xyz789");
        assert!(verify_payment_signature(
            "order_abc123",
            "pay_xyz789",
            &sig,
            SECRET
        ));
    }

    #[test]
    fn test_single_character_mutation_rejected() {
        let sig = sign("order_abc123", "pay_xyz789");
        let mut tampered = sig.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });

        assert!(!verify_payment_signature(
            "order_abc123",
            "pay_xyz789",
            &tampered,
            SECRET
        ));
    }

    #[test]
    fn test_signature_bound_to_order_and_payment() {
        let sig = sign("order_abc123", "pay_xyz789");
        assert!(!verify_payment_signature(
            "order_other",
            "pay_xyz789",
            &sig,
            SECRET
        ));
        assert!(!verify_payment_signature(
            "order_abc123",
            "pay_other",
            &sig,
            SECRET
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let sig = sign("order_abc123", "pay_xyz789");
        assert!(!verify_payment_signature(
            "order_abc123",
            "pay_xyz789",
            &sig,
            "a_different_secret"
        ));
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        assert!(!verify_payment_signature(
            "order_abc123",
            "pay_xyz789",
            "not-hex-at-all",
            SECRET
        ));
    }

    #[test]
    fn test_empty_signature_rejected() {
        assert!(!verify_payment_signature(
            "order_abc123",
            "pay_xyz789",
            "",
            SECRET
        ));
    }
}
