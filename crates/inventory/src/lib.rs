//! `lootpool-inventory` — quantity-bearing loot and its lifecycle.
//!
//! Items carry an explicit state machine instead of "does a related row
//! exist" checks; splitting partitions quantity and ledger history exactly;
//! stacking is a presentation-level merge that never touches money.

pub mod item;
pub mod split;
pub mod stack;

pub use item::{InventoryItem, ItemState, Location};
pub use split::{plan_split, SplitPlan};
pub use stack::{plan_stacking, Stack, StackingPlan};
