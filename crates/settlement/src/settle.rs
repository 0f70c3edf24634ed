//! Planning a settlement batch.
//!
//! The plan is pure: callers collect the batch inputs (sold items, their
//! loot groups, derived pool balances and share stakes) from committed
//! state, and apply the resulting postings inside one transaction.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use lootpool_core::{CharacterId, DomainError, DomainResult, LootGroupId, Money};
use lootpool_ledger::{EntryKind, LedgerAccount, LedgerEntry};
use lootpool_market::SoldItem;
use lootpool_shares::{calculate_participation, ParticipantStake};

/// One sold item entering a settlement batch.
#[derive(Debug, Clone)]
pub struct SettlementItem {
    pub sold: SoldItem,
    pub loot_group: LootGroupId,
    /// Derived pool balance of the underlying item (never a cached field).
    pub pool_balance: i128,
}

/// The staged outcome of a settlement batch.
#[derive(Debug, Clone)]
pub struct SettlementPlan {
    /// Pool debits, participant credits and the remainder posting, all
    /// sharing one timestamp so the two ledgers net to zero.
    pub entries: Vec<LedgerEntry>,
    /// Sold records with their transferred quantity advanced.
    pub settled_sold: Vec<SoldItem>,
    /// Floored per-participant payouts, seller included.
    pub payouts: Vec<(CharacterId, Money)>,
    pub total_settled: Money,
    pub others_share: Money,
    pub own_share: Money,
    /// Whole-batch rounding remainder, assigned to the seller.
    pub leftover: Money,
    pub item_count: usize,
}

/// Plan settling every unsettled unit in `batch` on behalf of `seller`.
///
/// Returns `Ok(None)` when nothing in the batch has unsettled quantity -
/// re-settling a settled batch is a no-op, not an error. Any validation
/// failure rejects the whole batch with no staged postings.
pub fn plan_settlement(
    batch: &[SettlementItem],
    stakes_by_group: &BTreeMap<LootGroupId, Vec<ParticipantStake>>,
    seller: CharacterId,
    keep_own_share_as_credit: bool,
    now: DateTime<Utc>,
) -> DomainResult<Option<SettlementPlan>> {
    let open: Vec<&SettlementItem> = batch
        .iter()
        .filter(|i| i.sold.unsettled_quantity() > 0)
        .collect();
    if open.is_empty() {
        return Ok(None);
    }

    let mut entries = Vec::new();
    let mut settled_sold = Vec::with_capacity(open.len());
    let mut group_profit: BTreeMap<LootGroupId, i128> = BTreeMap::new();
    let mut total_profit: i128 = 0;

    for item in &open {
        if item.pool_balance < 0 {
            return Err(DomainError::consistency(format!(
                "negative profit on item {}: balance {}; needs admin review",
                item.sold.item(),
                item.pool_balance
            )));
        }

        let unsettled = item.sold.unsettled_quantity();
        // Scale the balance to the unsettled fraction, floored to minor
        // units; the fractional tail stays on the pool account until the
        // final settlement of the item.
        let profit =
            item.pool_balance * unsettled as i128 / item.sold.quantity() as i128;

        entries.push(LedgerEntry::post(
            LedgerAccount::Pool(item.sold.item()),
            -Money::from_widened(profit)?,
            EntryKind::Deposit,
            unsettled,
            format!("settled {unsettled} units"),
            now,
        ));
        settled_sold.push(item.sold.advanced_by(unsettled)?);

        *group_profit.entry(item.loot_group).or_default() += profit;
        total_profit += profit;
    }

    // Per-group participation, accumulated un-floored per character.
    let mut claims: BTreeMap<CharacterId, Decimal> = BTreeMap::new();
    for (group, profit) in &group_profit {
        let stakes = stakes_by_group
            .get(group)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let participation = calculate_participation(*profit, stakes)?;
        for payout in participation.payouts {
            *claims.entry(payout.character).or_default() += payout.total();
        }
    }

    // Floor once, at the posting boundary.
    let mut payouts = Vec::with_capacity(claims.len());
    let mut floored_total: i128 = 0;
    for (character, claim) in &claims {
        let amount = Money::floor_from_decimal(*claim)?;
        floored_total += amount.widened();
        payouts.push((*character, amount));
    }

    let remainder = total_profit - floored_total;
    debug_assert!(remainder >= 0);
    let leftover = Money::from_widened(remainder)?;

    for (character, amount) in &payouts {
        if amount.is_zero() {
            continue;
        }
        entries.push(LedgerEntry::post(
            LedgerAccount::Credit(*character),
            *amount,
            EntryKind::Credit,
            0,
            "loot payout",
            now,
        ));
    }

    // The rounding remainder goes to the selling character, never split.
    if !leftover.is_zero() {
        entries.push(LedgerEntry::post(
            LedgerAccount::Credit(seller),
            leftover,
            EntryKind::FractionalRemainder,
            0,
            "settlement rounding remainder",
            now,
        ));
    }

    let own_share = payouts
        .iter()
        .find(|(c, _)| *c == seller)
        .map(|(_, m)| *m)
        .unwrap_or(Money::ZERO);
    let others_share = Money::from_widened(floored_total - own_share.widened())?;

    // Seller takes their share (and leftover) in cash: offset the credit so
    // the books reflect that nothing is owed to them from the pot.
    if !keep_own_share_as_credit {
        let cash = own_share + leftover;
        if !cash.is_zero() {
            entries.push(LedgerEntry::post(
                LedgerAccount::Credit(seller),
                -cash,
                EntryKind::Deposit,
                0,
                "own share taken in cash at sale",
                now,
            ));
        }
    }

    Ok(Some(SettlementPlan {
        entries,
        settled_sold,
        payouts,
        total_settled: Money::from_widened(total_profit)?,
        others_share,
        own_share,
        leftover,
        item_count: open.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lootpool_core::{InventoryItemId, Rate, SoldItemId};
    use lootpool_market::SoldVia;
    use lootpool_shares::ParticipantStake;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn sold(quantity: i64) -> SoldItem {
        SoldItem::new(
            SoldItemId::new(),
            InventoryItemId::new(),
            quantity,
            SoldVia::InternalMarket,
            Utc::now(),
        )
        .unwrap()
    }

    fn stake(character: CharacterId, shares: u32, cut: Decimal) -> ParticipantStake {
        ParticipantStake {
            character,
            share_quantity: shares,
            flat_percent_cut: Rate::from_percent(cut).unwrap(),
        }
    }

    fn single_item_batch(balance: i128, quantity: i64) -> (Vec<SettlementItem>, LootGroupId) {
        let group = LootGroupId::new();
        let batch = vec![SettlementItem {
            sold: sold(quantity),
            loot_group: group,
            pool_balance: balance,
        }];
        (batch, group)
    }

    #[test]
    fn two_even_shares_with_one_cut() {
        let seller = CharacterId::new();
        let other = CharacterId::new();
        let (batch, group) = single_item_batch(8500, 10);
        let stakes =
            BTreeMap::from([(group, vec![stake(seller, 1, dec!(5)), stake(other, 1, dec!(0))])]);

        let plan = plan_settlement(&batch, &stakes, seller, true, Utc::now())
            .unwrap()
            .unwrap();

        // Cut participant: 425 flat + 4037 floored share; other: 4037;
        // the 1-unit rounding remainder goes to the seller.
        let by_char: BTreeMap<CharacterId, Money> = plan.payouts.iter().copied().collect();
        assert_eq!(by_char[&seller], Money::new(4462));
        assert_eq!(by_char[&other], Money::new(4037));
        assert_eq!(plan.leftover, Money::new(1));
        assert_eq!(plan.total_settled, Money::new(8500));
        assert_eq!(plan.own_share, Money::new(4462));
        assert_eq!(plan.others_share, Money::new(4037));

        // Seller's credit across payout + remainder = 4463.
        let seller_credit: i128 = plan
            .entries
            .iter()
            .filter(|e| e.account() == LedgerAccount::Credit(seller))
            .map(|e| e.amount().widened())
            .sum();
        assert_eq!(seller_credit, 4463);
    }

    #[test]
    fn batch_conserves_to_the_minor_unit() {
        let seller = CharacterId::new();
        let (batch, group) = single_item_batch(8500, 10);
        let stakes = BTreeMap::from([(
            group,
            vec![
                stake(seller, 1, dec!(5)),
                stake(CharacterId::new(), 1, dec!(0)),
            ],
        )]);

        let plan = plan_settlement(&batch, &stakes, seller, true, Utc::now())
            .unwrap()
            .unwrap();

        let paid: i128 = plan.payouts.iter().map(|(_, m)| m.widened()).sum();
        assert_eq!(paid + plan.leftover.widened(), 8500);

        // Pool debits mirror the settled profit exactly.
        let pool_total: i128 = plan
            .entries
            .iter()
            .filter(|e| matches!(e.account(), LedgerAccount::Pool(_)))
            .map(|e| e.amount().widened())
            .sum();
        assert_eq!(pool_total, -8500);
    }

    #[test]
    fn negative_balance_blocks_the_whole_batch() {
        let seller = CharacterId::new();
        let group = LootGroupId::new();
        let batch = vec![
            SettlementItem {
                sold: sold(5),
                loot_group: group,
                pool_balance: 1_000,
            },
            SettlementItem {
                sold: sold(5),
                loot_group: group,
                pool_balance: -1,
            },
        ];
        let stakes = BTreeMap::from([(group, vec![stake(seller, 1, dec!(0))])]);

        let err = plan_settlement(&batch, &stakes, seller, true, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Consistency(_)));
    }

    #[test]
    fn missing_stakes_block_the_whole_batch() {
        let seller = CharacterId::new();
        let (batch, _group) = single_item_batch(1_000, 5);

        let err = plan_settlement(&batch, &BTreeMap::new(), seller, true, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Consistency(_)));
    }

    #[test]
    fn fully_settled_batch_is_a_noop() {
        let seller = CharacterId::new();
        let group = LootGroupId::new();
        let settled = sold(4).advanced_by(4).unwrap();
        let batch = vec![SettlementItem {
            sold: settled,
            loot_group: group,
            pool_balance: 0,
        }];
        let stakes = BTreeMap::from([(group, vec![stake(seller, 1, dec!(0))])]);

        let plan = plan_settlement(&batch, &stakes, seller, true, Utc::now()).unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn partial_settlement_scales_the_balance() {
        let seller = CharacterId::new();
        let group = LootGroupId::new();
        let half_settled = sold(10).advanced_by(5).unwrap();
        let batch = vec![SettlementItem {
            sold: half_settled,
            loot_group: group,
            // 9_999 over 10 units; 5 unsettled -> floor(4_999.5) = 4_999
            pool_balance: 9_999,
        }];
        let stakes = BTreeMap::from([(group, vec![stake(seller, 1, dec!(0))])]);

        let plan = plan_settlement(&batch, &stakes, seller, true, Utc::now())
            .unwrap()
            .unwrap();

        assert_eq!(plan.total_settled, Money::new(4_999));
        assert!(plan.settled_sold[0].is_fully_settled());
    }

    #[test]
    fn cash_takers_get_their_credit_offset() {
        let seller = CharacterId::new();
        let other = CharacterId::new();
        let (batch, group) = single_item_batch(8500, 10);
        let stakes =
            BTreeMap::from([(group, vec![stake(seller, 1, dec!(5)), stake(other, 1, dec!(0))])]);

        let plan = plan_settlement(&batch, &stakes, seller, false, Utc::now())
            .unwrap()
            .unwrap();

        // Postings still record payout + remainder, then the cash offset
        // cancels them; only the other participant is owed from the pot.
        let seller_credit: i128 = plan
            .entries
            .iter()
            .filter(|e| e.account() == LedgerAccount::Credit(seller))
            .map(|e| e.amount().widened())
            .sum();
        assert_eq!(seller_credit, 0);

        let other_credit: i128 = plan
            .entries
            .iter()
            .filter(|e| e.account() == LedgerAccount::Credit(other))
            .map(|e| e.amount().widened())
            .sum();
        assert_eq!(other_credit, 4037);
    }

    proptest! {
        /// Settlement conservation: floored payouts plus the remainder equal
        /// the settled profit exactly, for any batch shape.
        #[test]
        fn payouts_plus_remainder_equal_profit(
            balances in prop::collection::vec(0i128..1_000_000_000, 1..6),
            share_weights in prop::collection::vec(1u32..50, 1..8),
            cut_percent in 0u32..10,
        ) {
            let seller = CharacterId::new();
            let group = LootGroupId::new();

            let batch: Vec<SettlementItem> = balances
                .iter()
                .map(|b| SettlementItem {
                    sold: sold(7),
                    loot_group: group,
                    pool_balance: *b,
                })
                .collect();

            let mut stakes: Vec<ParticipantStake> = share_weights
                .iter()
                .map(|w| stake(CharacterId::new(), *w, dec!(0)))
                .collect();
            stakes[0] = stake(seller, stakes[0].share_quantity, Decimal::from(cut_percent));
            let stakes_by_group = BTreeMap::from([(group, stakes)]);

            let plan = plan_settlement(&batch, &stakes_by_group, seller, true, Utc::now())
                .unwrap()
                .unwrap();

            let paid: i128 = plan.payouts.iter().map(|(_, m)| m.widened()).sum();
            prop_assert_eq!(paid + plan.leftover.widened(), plan.total_settled.widened());

            // Nothing is created or destroyed across the two ledgers.
            let net: i128 = plan.entries.iter().map(|e| e.amount().widened()).sum();
            prop_assert_eq!(net, 0);
        }
    }
}
