//! Shipping aggregator client.
//!
//! Authenticates to the carrier aggregator with email/password, caches the
//! bearer token on disk, queries courier serviceability for a route, and
//! picks the cheapest courier. Every failure degrades to a fixed fallback
//! rate: a shipping-rate lookup must never block checkout.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::instrument;

use amara_core::Money;

use crate::config::ShippingConfig;

/// Aggregator API base URL.
const API_BASE: &str = "https://apiv2.shiprocket.in/v1/external";

/// Bearer token lifetime.
const TOKEN_TTL_HOURS: i64 = 24;

/// Refresh the token when less than this much validity remains.
const TOKEN_REFRESH_MARGIN_HOURS: i64 = 1;

/// Flat rate returned when no live quote is available.
const FALLBACK_RATE: Money = Money::from_minor(9_900);

/// Courier label used for fallback quotes.
const FALLBACK_COURIER: &str = "Standard Shipping";

/// Errors from the aggregator API. Internal only: the public `quote` method
/// converts all of these into the fallback rate.
#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error("shipping credentials not configured")]
    NotConfigured,
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no couriers service this route")]
    NoCouriers,
    #[error("token cache I/O error: {0}")]
    TokenCache(#[from] std::io::Error),
}

/// A single courier option returned by the serviceability query.
#[derive(Debug, Clone, Deserialize)]
pub struct CourierOption {
    #[serde(rename = "courier_name")]
    pub name: String,
    /// Rate in major currency units, as the aggregator reports it.
    pub rate: f64,
    /// Estimated delivery date, free-form.
    #[serde(default)]
    pub etd: Option<String>,
}

/// A shipping rate quote.
#[derive(Debug, Clone, Serialize)]
pub struct RateQuote {
    pub courier: String,
    pub rate: Money,
    pub estimated_delivery: Option<String>,
    /// True when the quote is the fixed fallback rather than a live rate.
    pub fallback: bool,
}

impl RateQuote {
    fn fallback() -> Self {
        Self {
            courier: FALLBACK_COURIER.to_string(),
            rate: FALLBACK_RATE,
            estimated_delivery: None,
            fallback: true,
        }
    }
}

/// On-disk form of the cached bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Whether less than the refresh margin of validity remains.
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - Duration::hours(TOKEN_REFRESH_MARGIN_HOURS)
    }
}

/// Shipping aggregator API client.
#[derive(Clone)]
pub struct ShippingClient {
    inner: Arc<ShippingClientInner>,
}

struct ShippingClientInner {
    client: reqwest::Client,
    email: Option<String>,
    password: Option<SecretString>,
    pickup_postcode: String,
    cache_path: PathBuf,
    /// In-memory copy of the disk cache
    token: RwLock<Option<CachedToken>>,
}

impl ShippingClient {
    /// Create a client from configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &ShippingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(ShippingClientInner {
                client,
                email: config.email.clone(),
                password: config.password.clone(),
                pickup_postcode: config.pickup_postcode.clone(),
                cache_path: config.token_cache_path.clone(),
                token: RwLock::new(None),
            }),
        }
    }

    /// Quote delivery for a destination postcode and parcel weight.
    ///
    /// Never fails: auth errors, network errors, and empty courier lists all
    /// degrade to the fixed fallback rate with a placeholder courier label.
    #[instrument(skip(self))]
    pub async fn quote(&self, destination_postcode: &str, weight_kg: f64) -> RateQuote {
        match self.live_quote(destination_postcode, weight_kg).await {
            Ok(quote) => quote,
            Err(e) => {
                tracing::warn!(error = %e, "Shipping quote failed, using fallback rate");
                RateQuote::fallback()
            }
        }
    }

    async fn live_quote(
        &self,
        destination_postcode: &str,
        weight_kg: f64,
    ) -> Result<RateQuote, ShippingError> {
        let token = self.bearer_token().await?;

        #[derive(Deserialize)]
        struct Serviceability {
            data: ServiceabilityData,
        }

        #[derive(Deserialize)]
        struct ServiceabilityData {
            #[serde(default)]
            available_courier_companies: Vec<CourierOption>,
        }

        let response = self
            .inner
            .client
            .get(format!("{API_BASE}/courier/serviceability/"))
            .bearer_auth(&token)
            .query(&[
                ("pickup_postcode", self.inner.pickup_postcode.as_str()),
                ("delivery_postcode", destination_postcode),
                ("weight", &weight_kg.to_string()),
                ("cod", "0"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: Serviceability = response.json().await?;
        let cheapest = select_cheapest(&body.data.available_courier_companies)
            .ok_or(ShippingError::NoCouriers)?;

        Ok(RateQuote {
            courier: cheapest.name.clone(),
            rate: to_minor_units(cheapest.rate),
            estimated_delivery: cheapest.etd.clone(),
            fallback: false,
        })
    }

    /// Get a valid bearer token, refreshing via the disk cache or a fresh
    /// login as needed.
    async fn bearer_token(&self) -> Result<String, ShippingError> {
        let now = Utc::now();

        // Fast path: in-memory token still comfortably valid
        if let Some(cached) = self.inner.token.read().await.as_ref()
            && !cached.needs_refresh(now)
        {
            return Ok(cached.token.clone());
        }

        // Try the disk cache before re-authenticating
        if let Some(cached) = self.load_cached_token().await
            && !cached.needs_refresh(now)
        {
            let token = cached.token.clone();
            *self.inner.token.write().await = Some(cached);
            return Ok(token);
        }

        let cached = self.authenticate(now).await?;
        let token = cached.token.clone();
        if let Err(e) = self.store_cached_token(&cached).await {
            tracing::warn!(error = %e, "Failed to write shipping token cache");
        }
        *self.inner.token.write().await = Some(cached);
        Ok(token)
    }

    /// Authenticate with email/password and return a fresh token.
    #[instrument(skip(self))]
    async fn authenticate(&self, now: DateTime<Utc>) -> Result<CachedToken, ShippingError> {
        let (Some(email), Some(password)) = (&self.inner.email, &self.inner.password) else {
            return Err(ShippingError::NotConfigured);
        };

        #[derive(Serialize)]
        struct LoginRequest<'a> {
            email: &'a str,
            password: &'a str,
        }

        #[derive(Deserialize)]
        struct LoginResponse {
            token: String,
        }

        let response = self
            .inner
            .client
            .post(format!("{API_BASE}/auth/login"))
            .json(&LoginRequest {
                email,
                password: password.expose_secret(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShippingError::AuthenticationFailed(format!(
                "HTTP {status}: {body}"
            )));
        }

        let login: LoginResponse = response.json().await?;
        Ok(CachedToken {
            token: login.token,
            expires_at: now + Duration::hours(TOKEN_TTL_HOURS),
        })
    }

    async fn load_cached_token(&self) -> Option<CachedToken> {
        let raw = tokio::fs::read_to_string(&self.inner.cache_path)
            .await
            .ok()?;
        serde_json::from_str(&raw).ok()
    }

    async fn store_cached_token(&self, token: &CachedToken) -> Result<(), ShippingError> {
        let raw = serde_json::to_string(token)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(&self.inner.cache_path, raw).await?;
        Ok(())
    }
}

/// Pick the cheapest courier: stable sort by rate ascending, first element
/// wins, ties broken by original response order.
fn select_cheapest(couriers: &[CourierOption]) -> Option<&CourierOption> {
    let mut indexed: Vec<&CourierOption> = couriers.iter().collect();
    indexed.sort_by(|a, b| a.rate.total_cmp(&b.rate));
    indexed.into_iter().next()
}

/// Convert an aggregator rate in major units to minor units.
fn to_minor_units(rate: f64) -> Money {
    #[allow(clippy::cast_possible_truncation)] // Rates are far below i64 range
    Money::from_minor((rate * 100.0).round() as i64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn courier(name: &str, rate: f64) -> CourierOption {
        CourierOption {
            name: name.to_string(),
            rate,
            etd: None,
        }
    }

    #[test]
    fn test_select_cheapest_picks_lowest_rate() {
        let couriers = vec![
            courier("Bluebird", 220.0),
            courier("Swift", 150.0),
            courier("Premium Air", 300.0),
        ];

        let cheapest = select_cheapest(&couriers).unwrap();
        assert_eq!(cheapest.name, "Swift");
        assert!((cheapest.rate - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_select_cheapest_tie_keeps_response_order() {
        let couriers = vec![
            courier("First", 100.0),
            courier("Second", 100.0),
            courier("Third", 250.0),
        ];

        let cheapest = select_cheapest(&couriers).unwrap();
        assert_eq!(cheapest.name, "First");
    }

    #[test]
    fn test_select_cheapest_empty_is_none() {
        assert!(select_cheapest(&[]).is_none());
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(150.0), Money::from_minor(15_000));
        assert_eq!(to_minor_units(99.99), Money::from_minor(9_999));
    }

    #[test]
    fn test_fallback_quote_shape() {
        let quote = RateQuote::fallback();
        assert_eq!(quote.courier, FALLBACK_COURIER);
        assert_eq!(quote.rate, FALLBACK_RATE);
        assert!(quote.fallback);
    }

    #[test]
    fn test_token_needs_refresh_inside_margin() {
        let now = Utc::now();
        let token = CachedToken {
            token: "t".to_string(),
            expires_at: now + Duration::minutes(30),
        };
        // Less than an hour of validity remains
        assert!(token.needs_refresh(now));

        let fresh = CachedToken {
            token: "t".to_string(),
            expires_at: now + Duration::hours(TOKEN_TTL_HOURS),
        };
        assert!(!fresh.needs_refresh(now));
    }

    #[tokio::test]
    async fn test_quote_without_credentials_falls_back() {
        let config = ShippingConfig {
            email: None,
            password: None,
            pickup_postcode: "110001".to_string(),
            token_cache_path: std::env::temp_dir().join("amara-test-shipping-token.json"),
            webhook_token: None,
            enforce_webhook_token: false,
        };
        let client = ShippingClient::new(&config);

        let quote = client.quote("302001", 0.5).await;
        assert!(quote.fallback);
        assert_eq!(quote.rate, FALLBACK_RATE);
        assert_eq!(quote.courier, FALLBACK_COURIER);
    }
}
