//! One-time password store.
//!
//! Short-lived, single-use numeric codes gating anonymous order-status
//! lookup. The store is process-local and not shared across instances; the
//! deployment assumption is a single server process.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

/// Code lifetime.
const OTP_TTL_MINUTES: i64 = 5;

/// A pending code for one subject.
#[derive(Debug, Clone)]
struct OtpEntry {
    code: String,
    expires_at: DateTime<Utc>,
}

/// In-memory store of pending OTP codes, keyed by lowercase email.
///
/// `generate` overwrites any prior pending code for the same key. `verify`
/// fails closed: missing record, expired record (deleted on check), or
/// mismatched code all return `false`; an exact match consumes the record.
#[derive(Clone, Default)]
pub struct OtpStore {
    entries: Arc<RwLock<HashMap<String, OtpEntry>>>,
}

impl OtpStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a 6-digit code for `key`, valid for five minutes.
    ///
    /// Any prior pending code for the key is overwritten.
    pub async fn generate(&self, key: &str) -> String {
        self.generate_at(key, Utc::now()).await
    }

    /// Verify and consume a code for `key`.
    pub async fn verify(&self, key: &str, code: &str) -> bool {
        self.verify_at(key, code, Utc::now()).await
    }

    async fn generate_at(&self, key: &str, now: DateTime<Utc>) -> String {
        let code = generate_code();
        let entry = OtpEntry {
            code: code.clone(),
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
        };
        self.entries
            .write()
            .await
            .insert(key.to_lowercase(), entry);
        code
    }

    async fn verify_at(&self, key: &str, code: &str, now: DateTime<Utc>) -> bool {
        let key = key.to_lowercase();
        let mut entries = self.entries.write().await;

        let Some(entry) = entries.get(&key) else {
            return false;
        };

        if now > entry.expires_at {
            entries.remove(&key);
            return false;
        }

        if entry.code != code {
            return false;
        }

        // Single-use: consume on success
        entries.remove(&key);
        true
    }
}

/// Generate a 6-digit numeric code.
fn generate_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_format() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_verify_roundtrip() {
        let store = OtpStore::new();
        let code = store.generate("buyer@example.com").await;
        assert!(store.verify("buyer@example.com", &code).await);
    }

    #[tokio::test]
    async fn test_verify_is_single_use() {
        let store = OtpStore::new();
        let code = store.generate("buyer@example.com").await;
        assert!(store.verify("buyer@example.com", &code).await);
        assert!(!store.verify("buyer@example.com", &code).await);
    }

    #[tokio::test]
    async fn test_verify_wrong_code_fails_closed() {
        let store = OtpStore::new();
        let code = store.generate("buyer@example.com").await;
        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert!(!store.verify("buyer@example.com", wrong).await);
        // The record survives a failed attempt
        assert!(store.verify("buyer@example.com", &code).await);
    }

    #[tokio::test]
    async fn test_verify_unknown_key_fails() {
        let store = OtpStore::new();
        assert!(!store.verify("nobody@example.com", "123456").await);
    }

    #[tokio::test]
    async fn test_expired_code_fails_and_is_deleted() {
        let store = OtpStore::new();
        let issued = Utc::now();
        let code = store.generate_at("buyer@example.com", issued).await;

        let after_expiry = issued + Duration::minutes(OTP_TTL_MINUTES) + Duration::seconds(1);
        assert!(!store.verify_at("buyer@example.com", &code, after_expiry).await);
        // Deleted on the expiry check, so a later in-window attempt also fails
        assert!(!store.verify_at("buyer@example.com", &code, issued).await);
    }

    #[tokio::test]
    async fn test_code_valid_within_window() {
        let store = OtpStore::new();
        let issued = Utc::now();
        let code = store.generate_at("buyer@example.com", issued).await;

        let just_before = issued + Duration::minutes(OTP_TTL_MINUTES) - Duration::seconds(1);
        assert!(store.verify_at("buyer@example.com", &code, just_before).await);
    }

    #[tokio::test]
    async fn test_regenerate_overwrites_prior_code() {
        let store = OtpStore::new();
        let first = store.generate("buyer@example.com").await;
        let second = store.generate("buyer@example.com").await;

        if first != second {
            assert!(!store.verify("buyer@example.com", &first).await);
        }
        assert!(store.verify("buyer@example.com", &second).await);
    }

    #[tokio::test]
    async fn test_key_is_case_insensitive() {
        let store = OtpStore::new();
        let code = store.generate("Buyer@Example.COM").await;
        assert!(store.verify("buyer@example.com", &code).await);
    }
}
