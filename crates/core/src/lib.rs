//! Amara Core - Shared types library.
//!
//! This crate provides common types used across all Amara components:
//! - `server` - Storefront + admin JSON API
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, and the
//!   order status state machine
//! - [`cart`] - The cart model: line merging, quantity updates, compact
//!   persistence pairs, and rehydration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use types::*;
