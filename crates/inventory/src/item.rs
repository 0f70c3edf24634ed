use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lootpool_core::{
    CharacterId, DomainError, DomainResult, Entity, InventoryItemId, ItemTypeId, LocationId,
    LootGroupId, StackId,
};

/// Lifecycle state of an inventory item.
///
/// One explicit state per item replaces scattered "does a MarketOrder /
/// SoldItem / contract row exist" checks; all transitions go through
/// [`ItemState::ensure_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Available,
    Listed,
    Sold,
    Junked,
    Contracted,
}

impl ItemState {
    /// An item can be modified (split, listed, junked) only while Available.
    pub fn is_editable(self) -> bool {
        matches!(self, ItemState::Available)
    }

    /// Central transition table.
    pub fn ensure_transition(self, next: ItemState) -> DomainResult<()> {
        use ItemState::*;

        let allowed = matches!(
            (self, next),
            (Available, Listed) | (Available, Junked) | (Available, Contracted) | (Listed, Sold) | (Contracted, Sold)
        );

        if allowed {
            Ok(())
        } else {
            Err(DomainError::precondition(format!(
                "illegal item state transition {self:?} -> {next:?}"
            )))
        }
    }
}

/// A quantity of one fungible item type at one location.
///
/// `quantity == 0` means the units were consumed (listed, sold or junked);
/// the row and its ledger history stay behind for accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    id: InventoryItemId,
    item_type: ItemTypeId,
    location: LocationId,
    loot_group: Option<LootGroupId>,
    stack: Option<StackId>,
    quantity: i64,
    state: ItemState,
    acquired_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn new(
        id: InventoryItemId,
        item_type: ItemTypeId,
        location: LocationId,
        loot_group: Option<LootGroupId>,
        quantity: i64,
        acquired_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity < 0 {
            return Err(DomainError::validation(format!(
                "item quantity cannot be negative, got {quantity}"
            )));
        }
        Ok(Self {
            id,
            item_type,
            location,
            loot_group,
            stack: None,
            quantity,
            state: ItemState::Available,
            acquired_at,
        })
    }

    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn item_type(&self) -> ItemTypeId {
        self.item_type
    }

    pub fn location(&self) -> LocationId {
        self.location
    }

    pub fn loot_group(&self) -> Option<LootGroupId> {
        self.loot_group
    }

    pub fn stack(&self) -> Option<StackId> {
        self.stack
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    pub fn is_editable(&self) -> bool {
        self.state.is_editable()
    }

    pub fn ensure_editable(&self) -> DomainResult<()> {
        if self.is_editable() {
            Ok(())
        } else {
            Err(DomainError::precondition(format!(
                "item {} is not editable in state {:?}",
                self.id, self.state
            )))
        }
    }

    /// Copy with a different stack assignment (presentation only).
    pub fn with_stack(&self, stack: Option<StackId>) -> Self {
        Self {
            stack,
            ..self.clone()
        }
    }

    /// Consume the full quantity into a market listing.
    ///
    /// The quantity moves onto the order; the item keeps its ledger history.
    pub fn listed(&self) -> DomainResult<Self> {
        self.state.ensure_transition(ItemState::Listed)?;
        Ok(Self {
            quantity: 0,
            state: ItemState::Listed,
            ..self.clone()
        })
    }

    /// Mark a fully filled listing as sold.
    pub fn sold(&self) -> DomainResult<Self> {
        self.state.ensure_transition(ItemState::Sold)?;
        Ok(Self {
            state: ItemState::Sold,
            ..self.clone()
        })
    }

    /// Discard the remaining quantity; history is retained.
    pub fn junked(&self) -> DomainResult<Self> {
        self.state.ensure_transition(ItemState::Junked)?;
        Ok(Self {
            quantity: 0,
            state: ItemState::Junked,
            ..self.clone()
        })
    }

    pub(crate) fn reduced_by(&self, quantity: i64) -> Self {
        debug_assert!(quantity <= self.quantity);
        Self {
            quantity: self.quantity - quantity,
            ..self.clone()
        }
    }

    pub(crate) fn split_off(&self, id: InventoryItemId, quantity: i64) -> Self {
        Self {
            id,
            quantity,
            stack: self.stack,
            ..self.clone()
        }
    }
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A place where loot sits, with the characters allowed to administer it.
///
/// Identity itself is an external collaborator; the admin set is the one
/// authorization datum price changes need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    id: LocationId,
    name: String,
    admins: Vec<CharacterId>,
}

impl Location {
    pub fn new(id: LocationId, name: impl Into<String>, admins: Vec<CharacterId>) -> Self {
        Self {
            id,
            name: name.into(),
            admins,
        }
    }

    pub fn id_typed(&self) -> LocationId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_admin(&self, character: CharacterId) -> bool {
        self.admins.contains(&character)
    }
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
