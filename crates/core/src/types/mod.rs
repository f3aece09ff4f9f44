//! Shared type definitions.
//!
//! Newtype wrappers and enums used across the server and CLI.

mod email;
mod id;
mod money;
mod status;

pub use email::{Email, EmailError};
pub use id::{AddressId, OrderId, ProductId};
pub use money::Money;
pub use status::OrderStatus;
