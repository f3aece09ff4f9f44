//! Amara server library.
//!
//! Single binary serving the storefront API, the admin API, and inbound
//! webhooks. Exposed as a library so routes and services can be tested.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
