//! Cart model.
//!
//! The cart lives on the client and survives reloads, so the server treats it
//! as a persisted cache with an explicit contract: mutations keep at most one
//! line per product, persistence stores only `(product_id, quantity)` pairs,
//! and rehydration resolves each pair against the live catalog, silently
//! dropping anything that no longer resolves.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Money, ProductId};

/// Upper bound on a single line's quantity.
///
/// Keeps cart arithmetic well clear of overflow and lets server-side code
/// bind quantities as database integers without wrapping.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// Product data captured into a cart line.
///
/// A snapshot, not a live reference: the price shown in the cart is the price
/// at the time the product was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub image_url: Option<String>,
    pub stock: i32,
}

/// A single cart row: one product plus a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Locally generated row identifier. Distinguishes rows for UI purposes
    /// only; deduplication is keyed on the product id.
    pub line_id: Uuid,
    pub product: ProductSnapshot,
    pub quantity: u32,
}

/// The compact persisted form of a cart line.
///
/// Only identifiers and quantities are persisted, to bound storage size;
/// full product data is re-fetched on rehydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// An ordered collection of cart lines with at most one line per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// The cart lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Subtotal across all lines at snapshot prices.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines
            .iter()
            .fold(Money::ZERO, |acc, line| {
                acc + line.product.price.times(line.quantity)
            })
    }

    /// Add a product to the cart.
    ///
    /// If a line for the same product already exists its quantity is
    /// incremented by `quantity`; otherwise a new line is appended. A
    /// `quantity` of zero is a no-op.
    ///
    /// Quantities clamp at [`MAX_LINE_QUANTITY`]; live stock is not checked
    /// at this layer.
    pub fn add(&mut self, product: ProductSnapshot, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product.id == product.id)
        {
            line.quantity = line
                .quantity
                .saturating_add(quantity)
                .min(MAX_LINE_QUANTITY);
        } else {
            self.lines.push(CartLine {
                line_id: Uuid::new_v4(),
                product,
                quantity: quantity.min(MAX_LINE_QUANTITY),
            });
        }
    }

    /// Overwrite the quantity of a product's line.
    ///
    /// A quantity below 1 removes the line, matching the remove semantics.
    /// Updating an absent product is a no-op; quantities clamp at
    /// [`MAX_LINE_QUANTITY`].
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity < 1 {
            self.remove(product_id);
            return;
        }
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product.id == product_id)
        {
            line.quantity = quantity.min(MAX_LINE_QUANTITY);
        }
    }

    /// Remove a product's line. No-op if absent.
    pub fn remove(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product.id != product_id);
    }

    /// Empty the cart unconditionally.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Serialize to the compact persisted form.
    #[must_use]
    pub fn to_saved(&self) -> Vec<SavedLine> {
        self.lines
            .iter()
            .map(|line| SavedLine {
                product_id: line.product.id,
                quantity: line.quantity,
            })
            .collect()
    }

    /// Rebuild a cart from persisted pairs using `resolve` to look up each
    /// product.
    ///
    /// Pairs whose product cannot be resolved (deleted products, catalog
    /// fetch failures surfaced as `None`) are dropped without error; pairs
    /// with a zero quantity are dropped as degenerate.
    pub fn rehydrate<F>(saved: &[SavedLine], mut resolve: F) -> Self
    where
        F: FnMut(ProductId) -> Option<ProductSnapshot>,
    {
        let mut cart = Self::new();
        for pair in saved {
            if pair.quantity == 0 {
                continue;
            }
            if let Some(product) = resolve(pair.product_id) {
                cart.add(product, pair.quantity);
            }
        }
        cart
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snapshot(id: ProductId, price: i64) -> ProductSnapshot {
        ProductSnapshot {
            id,
            name: "Linen Shirt".to_string(),
            price: Money::from_minor(price),
            image_url: None,
            stock: 10,
        }
    }

    #[test]
    fn test_add_same_product_accumulates() {
        let id = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(snapshot(id, 1000), 1);
        cart.add(snapshot(id, 1000), 2);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_add_distinct_products_appends() {
        let mut cart = Cart::new();
        cart.add(snapshot(ProductId::generate(), 1000), 1);
        cart.add(snapshot(ProductId::generate(), 2000), 1);

        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn test_add_clamps_at_max_quantity() {
        let id = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(snapshot(id, 1000), u32::MAX);
        cart.add(snapshot(id, 1000), 2);

        assert_eq!(cart.lines()[0].quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_update_quantity_clamps_at_max() {
        let id = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(snapshot(id, 1000), 1);
        cart.update_quantity(id, u32::MAX);

        assert_eq!(cart.lines()[0].quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_add_zero_quantity_is_noop() {
        let mut cart = Cart::new();
        cart.add(snapshot(ProductId::generate(), 1000), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_overwrites() {
        let id = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(snapshot(id, 1000), 5);
        cart.update_quantity(id, 2);

        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_update_quantity_zero_removes_line() {
        let id = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(snapshot(id, 1000), 3);
        cart.update_quantity(id, 0);

        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add(snapshot(ProductId::generate(), 1000), 1);
        cart.remove(ProductId::generate());

        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_clear_always_empties() {
        let mut cart = Cart::new();
        cart.add(snapshot(ProductId::generate(), 1000), 1);
        cart.add(snapshot(ProductId::generate(), 2000), 4);
        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_subtotal_and_item_count() {
        let mut cart = Cart::new();
        cart.add(snapshot(ProductId::generate(), 1000), 2);
        cart.add(snapshot(ProductId::generate(), 500), 3);

        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.subtotal(), Money::from_minor(3500));
    }

    #[test]
    fn test_to_saved_stores_only_pairs() {
        let id = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(snapshot(id, 1000), 2);

        let saved = cart.to_saved();
        assert_eq!(
            saved,
            vec![SavedLine {
                product_id: id,
                quantity: 2
            }]
        );
    }

    #[test]
    fn test_rehydrate_resolves_and_drops() {
        let known = ProductId::generate();
        let deleted = ProductId::generate();
        let saved = vec![
            SavedLine {
                product_id: known,
                quantity: 2,
            },
            SavedLine {
                product_id: deleted,
                quantity: 1,
            },
        ];

        let cart = Cart::rehydrate(&saved, |id| (id == known).then(|| snapshot(known, 1000)));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].product.id, known);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_rehydrate_huge_duplicate_pairs_does_not_overflow() {
        let id = ProductId::generate();
        let saved = vec![
            SavedLine {
                product_id: id,
                quantity: u32::MAX,
            },
            SavedLine {
                product_id: id,
                quantity: 2,
            },
        ];

        let cart = Cart::rehydrate(&saved, |_| Some(snapshot(id, 1000)));

        assert_eq!(cart.lines()[0].quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_rehydrate_merges_duplicate_pairs() {
        let id = ProductId::generate();
        let saved = vec![
            SavedLine {
                product_id: id,
                quantity: 1,
            },
            SavedLine {
                product_id: id,
                quantity: 2,
            },
        ];

        let cart = Cart::rehydrate(&saved, |_| Some(snapshot(id, 1000)));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }
}
