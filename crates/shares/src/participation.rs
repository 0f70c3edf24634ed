//! The participation calculator: profit in, per-participant claims out.
//!
//! Pure and deterministic. All arithmetic is exact [`Decimal`]; nothing is
//! floored here, so callers can sum, scale and only round once at the
//! ledger posting boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lootpool_core::{CharacterId, DomainError, DomainResult, Rate};

/// One participant's claim inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantStake {
    pub character: CharacterId,
    pub share_quantity: u32,
    pub flat_percent_cut: Rate,
}

/// One participant's computed, un-floored claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantPayout {
    pub character: CharacterId,
    pub flat_cut: Decimal,
    pub share_amount: Decimal,
}

impl ParticipantPayout {
    pub fn total(&self) -> Decimal {
        self.flat_cut + self.share_amount
    }
}

/// Result of a participation computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    pub payouts: Vec<ParticipantPayout>,
    pub total_shares: u64,
    pub total_flat_cuts: Decimal,
}

/// Split `profit` (minor units) across the stakes.
///
/// Flat cuts come off gross profit first; what remains is split by share
/// weight. Fails with an over-allocation precondition when the cuts sum past
/// 100%, and with a consistency error when there is nobody to distribute to -
/// settlement must never silently pay out to no one.
pub fn calculate_participation(
    profit: i128,
    stakes: &[ParticipantStake],
) -> DomainResult<Participation> {
    let total_flat_cuts: Decimal = stakes
        .iter()
        .map(|s| s.flat_percent_cut.as_percent())
        .sum();
    if total_flat_cuts > Decimal::from(100) {
        return Err(DomainError::precondition(format!(
            "over-allocated cuts: flat cuts sum to {total_flat_cuts}%"
        )));
    }

    let total_shares: u64 = stakes.iter().map(|s| u64::from(s.share_quantity)).sum();
    if total_shares == 0 && total_flat_cuts.is_zero() {
        return Err(DomainError::consistency(
            "no participation: zero shares and zero flat cuts",
        ));
    }

    let profit = Decimal::from_i128_with_scale(profit, 0);
    let after_cuts = profit * (Decimal::from(100) - total_flat_cuts) / Decimal::from(100);

    let payouts = stakes
        .iter()
        .map(|stake| {
            let flat_cut = stake.flat_percent_cut.applied_to(profit);
            let share_amount = if total_shares == 0 {
                Decimal::ZERO
            } else {
                after_cuts * Decimal::from(stake.share_quantity) / Decimal::from(total_shares)
            };
            ParticipantPayout {
                character: stake.character,
                flat_cut,
                share_amount,
            }
        })
        .collect();

    Ok(Participation {
        payouts,
        total_shares,
        total_flat_cuts,
    })
}
