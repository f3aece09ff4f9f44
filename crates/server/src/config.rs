//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `ADMIN_API_TOKEN` - Bearer token for admin endpoints (min 32 chars, high entropy)
//! - `PAYMENT_KEY_ID` - Payment gateway key id
//! - `PAYMENT_KEY_SECRET` - Payment gateway key secret
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `PAYMENT_WEBHOOK_SECRET` - Shared secret for the payment webhook
//!   (defaults to `PAYMENT_KEY_SECRET`)
//! - `SHIPPING_EMAIL` / `SHIPPING_PASSWORD` - Shipping aggregator credentials
//! - `SHIPPING_PICKUP_POSTCODE` - Origin postcode for rate quotes
//! - `SHIPPING_TOKEN_CACHE` - Path of the on-disk bearer token cache
//! - `SHIPPING_WEBHOOK_TOKEN` - Static token expected on shipping webhooks
//! - `ENFORCE_SHIPPING_WEBHOOK_TOKEN` - Reject (not just log) token mismatches
//! - `ANTHROPIC_API_KEY` / `ANTHROPIC_MODEL` - AI description generation
//! - `OPENAI_API_KEY` - AI image generation
//! - `SMTP_HOST` / `SMTP_PORT` / `SMTP_USERNAME` / `SMTP_PASSWORD` /
//!   `SMTP_FROM` - Transactional email; leaving these unset disables delivery
//! - `EXPOSE_DEBUG_OTP` - Return OTP codes in responses. Development only;
//!   must never be set in production
//! - `SENTRY_DSN` / `SENTRY_ENVIRONMENT` - Error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_ADMIN_TOKEN_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token guarding admin endpoints
    pub admin_api_token: SecretString,
    /// Payment gateway configuration
    pub payment: PaymentConfig,
    /// Shipping aggregator configuration
    pub shipping: ShippingConfig,
    /// AI content generation configuration
    pub ai: AiConfig,
    /// SMTP configuration; `None` disables email delivery
    pub smtp: Option<SmtpConfig>,
    /// Return OTP codes in responses when no delivery provider is configured.
    /// Development convenience only; must never be enabled in production.
    pub expose_debug_otp: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Payment gateway configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PaymentConfig {
    /// Gateway API key id (public)
    pub key_id: String,
    /// Gateway API key secret
    pub key_secret: SecretString,
    /// Shared secret for webhook signature verification
    pub webhook_secret: SecretString,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

/// Shipping aggregator configuration.
#[derive(Clone)]
pub struct ShippingConfig {
    /// Aggregator account email; `None` disables live quotes (fallback only)
    pub email: Option<String>,
    /// Aggregator account password
    pub password: Option<SecretString>,
    /// Origin postcode for serviceability queries
    pub pickup_postcode: String,
    /// Path of the on-disk bearer token cache
    pub token_cache_path: PathBuf,
    /// Static token expected in the shipping webhook header
    pub webhook_token: Option<SecretString>,
    /// Reject webhook requests whose token does not match, instead of
    /// logging a warning and processing anyway
    pub enforce_webhook_token: bool,
}

impl std::fmt::Debug for ShippingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShippingConfig")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("pickup_postcode", &self.pickup_postcode)
            .field("token_cache_path", &self.token_cache_path)
            .field("webhook_token", &self.webhook_token.as_ref().map(|_| "[REDACTED]"))
            .field("enforce_webhook_token", &self.enforce_webhook_token)
            .finish()
    }
}

/// AI content generation configuration.
#[derive(Clone, Default)]
pub struct AiConfig {
    /// Anthropic API key for description generation
    pub anthropic_api_key: Option<SecretString>,
    /// Anthropic model name
    pub anthropic_model: String,
    /// `OpenAI` API key for image generation
    pub openai_api_key: Option<SecretString>,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field(
                "anthropic_api_key",
                &self.anthropic_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("anthropic_model", &self.anthropic_model)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// SMTP configuration for transactional email.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_env("DATABASE_URL").map(SecretString::from)?;
        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        let admin_api_token = get_validated_secret("ADMIN_API_TOKEN")?;
        validate_token_length(&admin_api_token, "ADMIN_API_TOKEN")?;

        let payment = PaymentConfig::from_env()?;
        let shipping = ShippingConfig::from_env();
        let ai = AiConfig::from_env();
        let smtp = SmtpConfig::from_env()?;
        let expose_debug_otp = get_bool_env("EXPOSE_DEBUG_OTP");
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            admin_api_token,
            payment,
            shipping,
            ai,
            smtp,
            expose_debug_otp,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let key_secret = get_validated_secret("PAYMENT_KEY_SECRET")?;
        let webhook_secret = match get_optional_env("PAYMENT_WEBHOOK_SECRET") {
            Some(value) => {
                validate_secret_strength(&value, "PAYMENT_WEBHOOK_SECRET")?;
                SecretString::from(value)
            }
            None => key_secret.clone(),
        };

        Ok(Self {
            key_id: get_required_env("PAYMENT_KEY_ID")?,
            key_secret,
            webhook_secret,
        })
    }
}

impl ShippingConfig {
    fn from_env() -> Self {
        Self {
            email: get_optional_env("SHIPPING_EMAIL"),
            password: get_optional_env("SHIPPING_PASSWORD").map(SecretString::from),
            pickup_postcode: get_env_or_default("SHIPPING_PICKUP_POSTCODE", "110001"),
            token_cache_path: PathBuf::from(get_env_or_default(
                "SHIPPING_TOKEN_CACHE",
                ".shipping-token.json",
            )),
            webhook_token: get_optional_env("SHIPPING_WEBHOOK_TOKEN").map(SecretString::from),
            enforce_webhook_token: get_bool_env("ENFORCE_SHIPPING_WEBHOOK_TOKEN"),
        }
    }
}

impl AiConfig {
    fn from_env() -> Self {
        Self {
            anthropic_api_key: get_optional_env("ANTHROPIC_API_KEY").map(SecretString::from),
            anthropic_model: get_env_or_default("ANTHROPIC_MODEL", "claude-sonnet-4-5"),
            openai_api_key: get_optional_env("OPENAI_API_KEY").map(SecretString::from),
        }
    }
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        let port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            host,
            port,
            username: get_required_env("SMTP_USERNAME")?,
            password: get_required_env("SMTP_PASSWORD").map(SecretString::from)?,
            from_address: get_required_env("SMTP_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a boolean flag ("1", "true", "yes" are truthy).
fn get_bool_env(key: &str) -> bool {
    get_optional_env(key)
        .is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Validate that a token meets minimum length requirements.
fn validate_token_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_ADMIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_ADMIN_TOKEN_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_token_length_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_token_length(&secret, "TEST_TOKEN").is_err());
    }

    #[test]
    fn test_validate_token_length_valid() {
        let secret = SecretString::from("a".repeat(32));
        assert!(validate_token_length(&secret, "TEST_TOKEN").is_ok());
    }

    #[test]
    fn test_payment_config_debug_redacts_secrets() {
        let config = PaymentConfig {
            key_id: "key_id_value".to_string(),
            key_secret: SecretString::from("super_secret_key"),
            webhook_secret: SecretString::from("super_secret_webhook"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("key_id_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_key"));
        assert!(!debug_output.contains("super_secret_webhook"));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            admin_api_token: SecretString::from("x".repeat(32)),
            payment: PaymentConfig {
                key_id: "key".to_string(),
                key_secret: SecretString::from("ks"),
                webhook_secret: SecretString::from("ws"),
            },
            shipping: ShippingConfig {
                email: None,
                password: None,
                pickup_postcode: "110001".to_string(),
                token_cache_path: PathBuf::from(".shipping-token.json"),
                webhook_token: None,
                enforce_webhook_token: false,
            },
            ai: AiConfig::default(),
            smtp: None,
            expose_debug_otp: false,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }
}
