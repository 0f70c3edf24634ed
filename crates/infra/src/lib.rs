//! `lootpool-infra` — the durable-state boundary.
//!
//! Row tables for every entity plus a pessimistic transaction wrapper.
//! Ledger entries are the durable source of truth; everything else is
//! either operational state (items, orders) or derived from the entries.

pub mod state;
pub mod store;

pub use state::StoreState;
pub use store::{InMemoryStore, StoreError, StoreTransaction};
