//! Stock keys, records and levels.
//!
//! A stock row is identified by a [`StockKey`] (product and location) and holds a
//! non-negative quantity. Quantities are `u32` so a negative stock level cannot be
//! represented; the ledger rejects any decrement that would cross zero.

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rows at or below this quantity are considered low on stock.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// Location that counts towards online stock even though its name does not say so.
pub const MAIN_STORE: &str = "main-store";

/// Catalog product identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a product identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store or warehouse holding stock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    /// Creates a location.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the location name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether stock held here is sold through the online channel.
    ///
    /// Online locations are those whose name contains `online`, plus the main store
    /// which ships online orders.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.0.contains("online") || self.0 == MAIN_STORE
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique key of a stock row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockKey {
    /// Product held
    pub product_id: ProductId,
    /// Where it is held
    pub location: Location,
}

impl StockKey {
    /// Creates a key from anything string-like.
    #[must_use]
    pub fn new(product_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            product_id: ProductId::new(product_id),
            location: Location::new(location),
        }
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.product_id, self.location)
    }
}

/// Current state of one stock row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    /// Row key
    pub key: StockKey,
    /// Units on hand
    pub quantity: u32,
    /// Time of the last mutation
    pub last_updated: DateTime<Utc>,
}

impl StockRecord {
    /// Classifies the row's quantity.
    #[must_use]
    pub const fn level(&self) -> StockLevel {
        StockLevel::of(self.quantity)
    }
}

/// Coarse stock classification.
///
/// Purchases move rows towards `OutOfStock`; restocks are the only way back to
/// `Healthy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    /// No units on hand
    OutOfStock,
    /// Between 1 and [`LOW_STOCK_THRESHOLD`] units
    Low,
    /// More than [`LOW_STOCK_THRESHOLD`] units
    Healthy,
}

impl StockLevel {
    /// Classifies a quantity.
    #[must_use]
    pub const fn of(quantity: u32) -> Self {
        match quantity {
            0 => Self::OutOfStock,
            q if q <= LOW_STOCK_THRESHOLD => Self::Low,
            _ => Self::Healthy,
        }
    }

    /// Whether the restock generator may select a row at this level.
    #[must_use]
    pub const fn needs_restock(self) -> bool {
        !matches!(self, Self::Healthy)
    }
}

/// Result of an applied ledger mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    /// Quantity before the mutation
    pub previous: u32,
    /// Quantity after the mutation
    pub new: u32,
}

impl StockChange {
    /// Creates a change record.
    #[must_use]
    pub const fn new(previous: u32, new: u32) -> Self {
        Self { previous, new }
    }

    /// Signed difference `new - previous`.
    #[must_use]
    pub fn delta(&self) -> i64 {
        i64::from(self.new) - i64::from(self.previous)
    }
}

/// Per-product inventory summary exposed to the storefront.
///
/// Thresholds and in-stock flags are derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// Product identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Image URL
    pub image: String,
    /// Catalog price
    pub price: Money,
    /// Sum over online locations
    pub online_stock: u64,
    /// Sum over every other location
    pub in_store_stock: u64,
    /// Always [`LOW_STOCK_THRESHOLD`]
    pub low_stock_threshold: u32,
    /// Latest mutation across the product's rows
    pub last_updated: DateTime<Utc>,
    /// `online_stock > 0`
    pub online_in_stock: bool,
    /// `in_store_stock > 0`
    pub in_store_in_stock: bool,
}

impl InventoryItem {
    /// Builds a summary, deriving the threshold and in-stock flags.
    #[must_use]
    pub const fn new(
        id: ProductId,
        name: String,
        image: String,
        price: Money,
        online_stock: u64,
        in_store_stock: u64,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            image,
            price,
            online_stock,
            in_store_stock,
            low_stock_threshold: LOW_STOCK_THRESHOLD,
            last_updated,
            online_in_stock: online_stock > 0,
            in_store_in_stock: in_store_stock > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_locations() {
        assert!(Location::new("main-store").is_online());
        assert!(Location::new("online-warehouse").is_online());
        assert!(!Location::new("downtown-store").is_online());
        assert!(!Location::new("mall-store").is_online());
    }

    #[test]
    fn stock_levels() {
        assert_eq!(StockLevel::of(0), StockLevel::OutOfStock);
        assert_eq!(StockLevel::of(1), StockLevel::Low);
        assert_eq!(StockLevel::of(10), StockLevel::Low);
        assert_eq!(StockLevel::of(11), StockLevel::Healthy);
        assert!(StockLevel::Low.needs_restock());
        assert!(!StockLevel::Healthy.needs_restock());
    }

    #[test]
    fn change_delta_is_signed() {
        assert_eq!(StockChange::new(5, 2).delta(), -3);
        assert_eq!(StockChange::new(0, 20).delta(), 20);
    }

    #[test]
    fn inventory_item_derives_flags() {
        let item = InventoryItem::new(
            ProductId::new("1"),
            "Hoodie".to_string(),
            "/hoodie.png".to_string(),
            Money::from_cents(4_999),
            0,
            12,
            Utc::now(),
        );
        assert!(!item.online_in_stock);
        assert!(item.in_store_in_stock);
        assert_eq!(item.low_stock_threshold, 10);
    }
}
