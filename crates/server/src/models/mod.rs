//! Database-backed entity models.

mod address;
mod order;
mod product;

pub use address::Address;
pub use order::{Order, OrderItem};
pub use product::Product;
