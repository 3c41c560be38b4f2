//! Inventory ownership rows produced by successful purchases.

use serde::{Deserialize, Serialize};

use crate::id::{AccountId, InventoryRecordId};

/// Append-only ownership row: exactly one per successful purchase, never
/// mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: InventoryRecordId,
    pub item_name: String,
    pub owner: AccountId,
}

impl InventoryRecord {
    pub fn new(item_name: impl Into<String>, owner: AccountId) -> Self {
        Self {
            id: InventoryRecordId::new(),
            item_name: item_name.into(),
            owner,
        }
    }
}
