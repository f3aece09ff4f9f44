//! Service clients and process-local stores.
//!
//! Each service wraps one external concern behind a small typed API:
//! payments (gateway orders + signature checks), shipping (rate quotes),
//! AI content generation, transactional email, and the in-memory OTP store.

pub mod ai;
pub mod email;
pub mod otp;
pub mod payments;
pub mod shipping;
