//! `lootpool-engine` — the command/query surface of the accounting core.
//!
//! Presentation layers (chat bots, web UIs) talk to [`LootService`] and
//! nothing else. Every command runs inside one store transaction: a failure
//! anywhere rolls the whole batch back, and nothing is ever retried
//! automatically.

pub mod service;

pub use service::LootService;
