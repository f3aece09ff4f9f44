//! Saved shipping address model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use amara_core::AddressId;

/// A saved shipping address.
///
/// At most one address per user carries the default flag; setting a new
/// default unsets the others in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_email: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
