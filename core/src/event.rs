//! Inventory events.
//!
//! Every applied stock mutation produces one [`InventoryEvent`] describing it. Events
//! are immutable and only ever appended; reads return them newest first.
//!
//! The trail is for observability. The ledger stays authoritative, and an event that
//! failed to append is not recreated later.

use crate::error::StoreError;
use crate::stock::{Location, ProductId, StockChange, StockKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of stock mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Units left the shelf
    Purchase,
    /// Units arrived
    Restock,
}

impl EventType {
    /// Convert to the persisted string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Restock => "restock",
        }
    }

    /// Parse from the persisted string representation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if the string is not a known event type.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "purchase" => Ok(Self::Purchase),
            "restock" => Ok(Self::Restock),
            _ => Err(StoreError::Corrupt(format!("Invalid event type: {s}"))),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the inventory event trail.
///
/// Invariant: `previous_stock + quantity_change == new_stock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEvent {
    /// Product whose stock changed
    pub product_id: ProductId,
    /// Purchase or restock
    pub event_type: EventType,
    /// Signed change applied to the row
    pub quantity_change: i64,
    /// Stock before the mutation
    pub previous_stock: u32,
    /// Stock after the mutation
    pub new_stock: u32,
    /// Location of the row
    pub location: Location,
    /// When the event was recorded
    pub created_at: DateTime<Utc>,
}

impl InventoryEvent {
    /// Builds the event describing an applied ledger mutation.
    ///
    /// `quantity_change` is derived from `change`, so the event is consistent by
    /// construction.
    #[must_use]
    pub fn from_change(
        key: &StockKey,
        event_type: EventType,
        change: StockChange,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id: key.product_id.clone(),
            event_type,
            quantity_change: change.delta(),
            previous_stock: change.previous,
            new_stock: change.new,
            location: key.location.clone(),
            created_at,
        }
    }

    /// Re-checks the event invariant, for rows loaded from storage.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        i64::from(self.previous_stock) + self.quantity_change == i64::from(self.new_stock)
    }

    /// Key of the stock row this event describes.
    #[must_use]
    pub fn key(&self) -> StockKey {
        StockKey {
            product_id: self.product_id.clone(),
            location: self.location.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use proptest::prelude::any;

    #[test]
    fn event_type_roundtrip() {
        for event_type in &[EventType::Purchase, EventType::Restock] {
            let parsed = EventType::parse(event_type.as_str()).expect("valid type should parse");
            assert_eq!(*event_type, parsed);
        }
    }

    #[test]
    fn event_type_invalid() {
        assert!(EventType::parse("refund").is_err());
    }

    #[test]
    fn purchase_event_has_negative_change() {
        let key = StockKey::new("7", "main-store");
        let event =
            InventoryEvent::from_change(&key, EventType::Purchase, StockChange::new(2, 0), Utc::now());

        assert_eq!(event.quantity_change, -2);
        assert_eq!(event.previous_stock, 2);
        assert_eq!(event.new_stock, 0);
        assert!(event.is_consistent());
        assert_eq!(event.key(), key);
    }

    #[test]
    fn tampered_event_is_inconsistent() {
        let key = StockKey::new("1", "mall-store");
        let mut event =
            InventoryEvent::from_change(&key, EventType::Restock, StockChange::new(0, 35), Utc::now());
        assert!(event.is_consistent());

        event.new_stock = 36;
        assert!(!event.is_consistent());
    }

    proptest::proptest! {
        #[test]
        fn from_change_is_always_consistent(previous in any::<u32>(), new in any::<u32>()) {
            let key = StockKey::new("9", "online-warehouse");
            let event = InventoryEvent::from_change(
                &key,
                EventType::Restock,
                StockChange::new(previous, new),
                Utc::now(),
            );
            proptest::prop_assert!(event.is_consistent());
        }
    }

    #[test]
    fn serializes_snake_case_for_feeds() {
        let key = StockKey::new("3", "downtown-store");
        let event =
            InventoryEvent::from_change(&key, EventType::Restock, StockChange::new(4, 24), Utc::now());
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event_type"], "restock");
        assert_eq!(json["quantity_change"], 20);
        assert_eq!(json["product_id"], "3");
    }
}
