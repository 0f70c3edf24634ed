//! `lootpool-shares` — who is owed what fraction of a loot group's profit.
//!
//! Share data is simple rows; the participation calculator is a pure
//! function over them with exact decimal arithmetic. Flooring to postable
//! amounts is deliberately NOT done here - that happens at the ledger
//! posting boundary during settlement.

pub mod participation;
pub mod share;

pub use participation::{calculate_participation, ParticipantPayout, ParticipantStake, Participation};
pub use share::{Character, LootGroup, LootShare};
