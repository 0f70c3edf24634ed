//! Stacking: presentation-level merge of same-type items at one location.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lootpool_core::{Entity, InventoryItemId, ItemTypeId, LocationId, StackId};

use crate::item::{InventoryItem, ItemState};

/// A transient grouping of same-type items at one location.
///
/// Exists purely to present "N waiting / M listed / K sold" as one unit;
/// membership lives on the items, and a stack with no members is destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    id: StackId,
    location: LocationId,
    item_type: ItemTypeId,
    created_at: DateTime<Utc>,
}

impl Stack {
    pub fn new(
        id: StackId,
        location: LocationId,
        item_type: ItemTypeId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            location,
            item_type,
            created_at,
        }
    }

    pub fn id_typed(&self) -> StackId {
        self.id
    }

    pub fn location(&self) -> LocationId {
        self.location
    }

    pub fn item_type(&self) -> ItemTypeId {
        self.item_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for Stack {
    type Id = StackId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Staged outcome of a stacking pass over one location.
#[derive(Debug, Clone, Default)]
pub struct StackingPlan {
    pub created: Vec<Stack>,
    /// Item -> surviving stack reassignments.
    pub assignments: Vec<(InventoryItemId, StackId)>,
    /// Stacks left without members (merged away).
    pub destroyed: Vec<StackId>,
}

impl StackingPlan {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.assignments.is_empty() && self.destroyed.is_empty()
    }
}

/// Plan a stacking pass: one stack per (location, item type) that has more
/// than one item; duplicate stacks merge into the earliest one and emptied
/// stacks are destroyed. Running the plan's output through this function
/// again produces a no-op.
pub fn plan_stacking(
    location: LocationId,
    items: &[InventoryItem],
    existing: &[Stack],
    now: DateTime<Utc>,
) -> StackingPlan {
    let mut plan = StackingPlan::default();

    // Junked items drop out of presentation entirely.
    let mut by_type: BTreeMap<ItemTypeId, Vec<&InventoryItem>> = BTreeMap::new();
    for item in items {
        if item.location() == location && item.state() != ItemState::Junked {
            by_type.entry(item.item_type()).or_default().push(item);
        }
    }

    for (item_type, members) in by_type {
        // Earliest stack for this (location, type) survives; later ones merge.
        let mut stacks: Vec<&Stack> = existing
            .iter()
            .filter(|s| s.location() == location && s.item_type() == item_type)
            .collect();
        stacks.sort_by_key(|s| s.created_at());

        let survivor = match stacks.first() {
            Some(stack) => stack.id_typed(),
            None => {
                if members.len() < 2 {
                    continue;
                }
                let stack = Stack::new(StackId::new(), location, item_type, now);
                let id = stack.id_typed();
                plan.created.push(stack);
                id
            }
        };

        for stack in stacks.iter().skip(1) {
            plan.destroyed.push(stack.id_typed());
        }

        for item in members {
            if item.stack() != Some(survivor) {
                plan.assignments.push((item.id_typed(), survivor));
            }
        }
    }

    // Stacks at this location whose members are all gone (or junked).
    for stack in existing {
        if stack.location() != location || plan.destroyed.contains(&stack.id_typed()) {
            continue;
        }
        let has_members = items.iter().any(|i| {
            i.location() == location
                && i.state() != ItemState::Junked
                && i.item_type() == stack.item_type()
        });
        if !has_members {
            plan.destroyed.push(stack.id_typed());
        }
    }

    plan
}
