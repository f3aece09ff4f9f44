//! Bearer-token authentication for admin routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::state::AppState;

/// Require a valid `Authorization: Bearer <token>` header matching the
/// configured admin token. Comparison is constant-time.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` when the header is missing, malformed,
/// or the token does not match.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

    let expected = state.config().admin_api_token.expose_secret();
    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        return Err(AppError::Unauthorized("invalid token".to_string()));
    }

    Ok(next.run(request).await)
}

/// Byte-wise constant-time equality. Length mismatch short-circuits, which
/// leaks only the token length.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret-token", b"secret-token"));
        assert!(!constant_time_eq(b"secret-token", b"secret-tokeX"));
        assert!(!constant_time_eq(b"secret-token", b"secret"));
        assert!(constant_time_eq(b"", b""));
    }
}
