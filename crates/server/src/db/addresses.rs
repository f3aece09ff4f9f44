//! Address repository.

use serde::Deserialize;
use sqlx::PgPool;

use amara_core::AddressId;

use super::RepositoryError;
use crate::models::Address;

/// Payload for creating or updating an address.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

fn default_country() -> String {
    "IN".to_string()
}

const ADDRESS_COLUMNS: &str = r"id, user_email, line1, line2, city, state,
       postcode, country, is_default, created_at, updated_at";

/// Repository for saved shipping addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_email: &str) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            r"
            SELECT {ADDRESS_COLUMNS} FROM address
            WHERE user_email = $1
            ORDER BY is_default DESC, created_at DESC
            "
        ))
        .bind(user_email)
        .fetch_all(self.pool)
        .await?;

        Ok(addresses)
    }

    /// Insert an address for a user.
    ///
    /// When the new address is flagged default, existing defaults are unset
    /// inside the same transaction so at most one default survives.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a concurrent write leaves two
    /// defaults racing for the unique index, and `RepositoryError::Database`
    /// if the transaction fails.
    pub async fn create(
        &self,
        user_email: &str,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            sqlx::query("UPDATE address SET is_default = FALSE WHERE user_email = $1")
                .bind(user_email)
                .execute(&mut *tx)
                .await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            r"
            INSERT INTO address (user_email, line1, line2, city, state, postcode,
                                 country, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(user_email)
        .bind(&input.line1)
        .bind(&input.line2)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.postcode)
        .bind(&input.country)
        .bind(input.is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_default_conflict)?;

        tx.commit().await?;
        Ok(address)
    }

    /// Replace an address's fields, maintaining the single-default invariant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not exist or
    /// belongs to another user.
    pub async fn update(
        &self,
        id: AddressId,
        user_email: &str,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            sqlx::query(
                "UPDATE address SET is_default = FALSE WHERE user_email = $1 AND id <> $2",
            )
            .bind(user_email)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            r"
            UPDATE address
            SET line1 = $3, line2 = $4, city = $5, state = $6, postcode = $7,
                country = $8, is_default = $9, updated_at = NOW()
            WHERE id = $1 AND user_email = $2
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user_email)
        .bind(&input.line1)
        .bind(&input.line2)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.postcode)
        .bind(&input.country)
        .bind(input.is_default)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_default_conflict)?;

        let address = address.ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;
        Ok(address)
    }

    /// Delete an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not exist or
    /// belongs to another user.
    pub async fn delete(&self, id: AddressId, user_email: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM address WHERE id = $1 AND user_email = $2")
            .bind(id)
            .bind(user_email)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Surface a violation of the one-default-per-user index as a conflict
/// rather than a generic database error.
fn map_default_conflict(err: sqlx::Error) -> RepositoryError {
    let hit_default_index = err
        .as_database_error()
        .and_then(|db| db.constraint())
        == Some("address_one_default_per_user");
    if hit_default_index {
        RepositoryError::Conflict("another default address was set concurrently".to_string())
    } else {
        RepositoryError::Database(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_address_input_defaults() {
        let input: AddressInput = serde_json::from_str(
            r#"{"line1":"14 Rose Lane","city":"Jaipur","state":"RJ","postcode":"302001"}"#,
        )
        .unwrap();
        assert_eq!(input.line2, "");
        assert_eq!(input.country, "IN");
        assert!(!input.is_default);
    }

    #[test]
    fn test_map_default_conflict_passes_other_errors_through() {
        let err = map_default_conflict(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
