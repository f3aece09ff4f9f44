//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Rate limiting (governor)
//! 4. Admin auth (bearer token, admin routes only)

pub mod admin_auth;
pub mod rate_limit;

pub use admin_auth::require_admin;
pub use rate_limit::{api_rate_limiter, otp_rate_limiter};
