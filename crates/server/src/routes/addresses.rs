//! Saved address handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use amara_core::{AddressId, Email};

use crate::db::{AddressInput, AddressRepository};
use crate::error::{AppError, Result};
use crate::models::Address;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EmailParams {
    pub email: String,
}

/// Upsert payload: a present `id` means update, otherwise create.
#[derive(Debug, Deserialize)]
pub struct AddressUpsert {
    pub email: String,
    pub id: Option<AddressId>,
    #[serde(flatten)]
    pub input: AddressInput,
}

fn normalize_email(raw: &str) -> Result<String> {
    Email::parse(raw)
        .map(Email::into_inner)
        .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))
}

/// `GET /api/addresses?email=` — a user's addresses, default first.
#[instrument(skip(state, params))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<EmailParams>,
) -> Result<Json<Vec<Address>>> {
    let email = normalize_email(&params.email)?;
    let addresses = AddressRepository::new(state.pool()).list(&email).await?;
    Ok(Json(addresses))
}

/// `POST /api/addresses` — create or update an address.
///
/// Flagging an address default unsets any other default for the same user
/// in the same transaction.
#[instrument(skip(state, payload))]
pub async fn upsert(
    State(state): State<AppState>,
    Json(payload): Json<AddressUpsert>,
) -> Result<Json<Address>> {
    let email = normalize_email(&payload.email)?;
    let repo = AddressRepository::new(state.pool());

    let address = match payload.id {
        Some(id) => repo.update(id, &email, &payload.input).await?,
        None => repo.create(&email, &payload.input).await?,
    };

    Ok(Json(address))
}

/// `DELETE /api/addresses/{id}?email=` — delete an address. Scoped to the
/// owning email so one user cannot delete another's rows.
#[instrument(skip(state, params))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
    Query(params): Query<EmailParams>,
) -> Result<Json<serde_json::Value>> {
    let email = normalize_email(&params.email)?;
    AddressRepository::new(state.pool())
        .delete(id, &email)
        .await?;
    Ok(Json(json!({ "success": true })))
}
