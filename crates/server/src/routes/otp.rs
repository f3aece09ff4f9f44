//! OTP issue/verify handlers for order tracking.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use amara_core::Email;

use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

/// `POST /api/otp/send` — generate and deliver a tracking code.
///
/// Regenerating overwrites any prior pending code. The code appears in the
/// response body only when `expose_debug_otp` is set, a development-only
/// escape hatch for environments without an email provider.
#[instrument(skip(state, request))]
pub async fn send(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<serde_json::Value>> {
    let email = Email::parse(&request.email)
        .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))?;

    let code = state.otp().generate(email.as_str()).await;

    if let Some(email_service) = state.email() {
        if let Err(e) = email_service.send_otp_code(email.as_str(), &code).await {
            tracing::warn!(error = %e, "OTP email delivery failed");
        }
    } else {
        tracing::info!("No email provider configured; OTP not delivered");
    }

    let mut body = json!({ "success": true });
    if state.config().expose_debug_otp {
        body["code"] = json!(code);
    }
    Ok(Json(body))
}

/// `POST /api/otp/verify` — verify and consume a code.
#[instrument(skip(state, request))]
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<serde_json::Value>> {
    let valid = state.otp().verify(&request.email, &request.code).await;
    Ok(Json(json!({ "valid": valid })))
}
