//! `lootpool-settlement` — sold loot into per-participant payouts.
//!
//! Settlement is planned as one batch of ledger postings that either applies
//! atomically or not at all; the instruction renderers are pure string
//! functions so they can be tested without touching persistence.

pub mod settle;
pub mod transfer;

pub use settle::{plan_settlement, SettlementItem, SettlementPlan};
pub use transfer::{
    render_deposit_command, render_transfer_command, TransferLog, MESSAGE_CHARACTER_LIMIT,
};
