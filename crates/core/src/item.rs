//! Catalog item: an immutable name → price entry, read-only to the engine.

use serde::{Deserialize, Serialize};

use crate::id::ItemId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Strictly positive price in coins.
    pub cost: i64,
}

impl Item {
    pub fn new(name: impl Into<String>, cost: i64) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            cost,
        }
    }
}
