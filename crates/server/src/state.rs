//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use amara_core::{ProductId, cart::ProductSnapshot};

use crate::config::ServerConfig;
use crate::services::ai::AiClient;
use crate::services::email::EmailService;
use crate::services::otp::OtpStore;
use crate::services::payments::PaymentClient;
use crate::services::shipping::ShippingClient;

/// Cached product snapshots for cart rehydration (5-minute TTL).
pub type ProductCache = Cache<ProductId, ProductSnapshot>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    payments: PaymentClient,
    shipping: ShippingClient,
    ai: AiClient,
    email: Option<EmailService>,
    otp: OtpStore,
    product_cache: ProductCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Email delivery is optional: a missing SMTP configuration or a relay
    /// setup failure leaves the service disabled rather than failing startup.
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool) -> Self {
        let payments = PaymentClient::new(&config.payment);
        let shipping = ShippingClient::new(&config.shipping);
        let ai = AiClient::new(&config.ai);

        let email = config.smtp.as_ref().and_then(|smtp| {
            EmailService::new(smtp)
                .inspect_err(|e| tracing::warn!(error = %e, "Email delivery disabled"))
                .ok()
        });

        let product_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                payments,
                shipping,
                ai,
                email,
                otp: OtpStore::new(),
                product_cache,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the payment gateway client.
    #[must_use]
    pub fn payments(&self) -> &PaymentClient {
        &self.inner.payments
    }

    /// Get a reference to the shipping aggregator client.
    #[must_use]
    pub fn shipping(&self) -> &ShippingClient {
        &self.inner.shipping
    }

    /// Get a reference to the AI content generation client.
    #[must_use]
    pub fn ai(&self) -> &AiClient {
        &self.inner.ai
    }

    /// Get the email service, if delivery is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Get a reference to the OTP store.
    #[must_use]
    pub fn otp(&self) -> &OtpStore {
        &self.inner.otp
    }

    /// Get a reference to the product snapshot cache.
    #[must_use]
    pub fn product_cache(&self) -> &ProductCache {
        &self.inner.product_cache
    }
}
