//! Splitting an item into sub-quantities without losing ledger history.

use lootpool_core::{DomainError, DomainResult, InventoryItemId};
use lootpool_ledger::{LedgerAccount, LedgerEntry};

use crate::item::InventoryItem;

/// The staged outcome of a split: nothing is persisted until the caller
/// applies all four parts inside one transaction.
#[derive(Debug, Clone)]
pub struct SplitPlan {
    /// Source item with its quantity reduced.
    pub source: InventoryItem,
    /// New item carrying the split-off quantity at the same location/group.
    pub new_item: InventoryItem,
    /// Rewritten source entries (same ids, reduced amounts).
    pub retained_entries: Vec<LedgerEntry>,
    /// Prorated entries for the new item.
    pub moved_entries: Vec<LedgerEntry>,
}

/// Plan a split of `new_quantity` units out of `item`.
///
/// Every pool entry on the source is partitioned by the ratio
/// `new_quantity / original_quantity`, truncating toward zero, so the sum of
/// amounts and quantities across both items equals the pre-split values
/// exactly; any truncation residue stays with the original item. Quantity is
/// the authoritative side of the split.
pub fn plan_split(
    item: &InventoryItem,
    pool_entries: &[&LedgerEntry],
    new_quantity: i64,
) -> DomainResult<SplitPlan> {
    item.ensure_editable()?;

    if new_quantity <= 0 || new_quantity >= item.quantity() {
        return Err(DomainError::precondition(format!(
            "invalid split: {new_quantity} of {} units",
            item.quantity()
        )));
    }

    let original_quantity = item.quantity();
    let new_id = InventoryItemId::new();
    let new_account = LedgerAccount::Pool(new_id);

    let mut retained_entries = Vec::with_capacity(pool_entries.len());
    let mut moved_entries = Vec::with_capacity(pool_entries.len());
    for entry in pool_entries {
        let (retained, moved) = entry.partitioned(new_account, new_quantity, original_quantity);
        retained_entries.push(retained);
        moved_entries.push(moved);
    }

    Ok(SplitPlan {
        source: item.reduced_by(new_quantity),
        new_item: item.split_off(new_id, new_quantity),
        retained_entries,
        moved_entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lootpool_core::{ItemTypeId, LocationId, LootGroupId, Money};
    use lootpool_ledger::EntryKind;
    use proptest::prelude::*;

    fn test_item(quantity: i64) -> InventoryItem {
        InventoryItem::new(
            InventoryItemId::new(),
            ItemTypeId::new(),
            LocationId::new(),
            Some(LootGroupId::new()),
            quantity,
            Utc::now(),
        )
        .unwrap()
    }

    fn fee_entry(item: &InventoryItem, amount: i64) -> LedgerEntry {
        LedgerEntry::post(
            LedgerAccount::Pool(item.id_typed()),
            Money::new(amount),
            EntryKind::BrokerFee,
            item.quantity(),
            "listing fee",
            Utc::now(),
        )
    }

    #[test]
    fn split_partitions_quantity() {
        let item = test_item(10);
        let plan = plan_split(&item, &[], 3).unwrap();

        assert_eq!(plan.source.quantity(), 7);
        assert_eq!(plan.new_item.quantity(), 3);
        assert_eq!(plan.new_item.location(), item.location());
        assert_eq!(plan.new_item.loot_group(), item.loot_group());
        assert_ne!(plan.new_item.id_typed(), item.id_typed());
    }

    #[test]
    fn split_bounds_are_enforced() {
        let item = test_item(10);

        for bad in [0, -1, 10, 11] {
            let err = plan_split(&item, &[], bad).unwrap_err();
            assert!(matches!(err, DomainError::Precondition(_)), "{bad}");
        }
    }

    #[test]
    fn listed_items_cannot_be_split() {
        let listed = test_item(10).listed().unwrap();
        assert!(plan_split(&listed, &[], 3).is_err());
    }

    #[test]
    fn split_prorates_entries_onto_the_new_item() {
        let item = test_item(10);
        let fee = fee_entry(&item, -1000);

        let plan = plan_split(&item, &[&fee], 3).unwrap();

        assert_eq!(plan.moved_entries.len(), 1);
        assert_eq!(plan.moved_entries[0].amount(), Money::new(-300));
        assert_eq!(
            plan.moved_entries[0].account(),
            LedgerAccount::Pool(plan.new_item.id_typed())
        );
        assert_eq!(plan.retained_entries[0].amount(), Money::new(-700));
        assert_eq!(plan.retained_entries[0].id_typed(), fee.id_typed());
    }

    proptest! {
        /// Quantity conservation: `source_after + new == source_before`.
        #[test]
        fn quantity_is_conserved(
            quantity in 2i64..1_000_000,
            split_point in 1i64..1_000_000,
        ) {
            prop_assume!(split_point < quantity);
            let item = test_item(quantity);

            let plan = plan_split(&item, &[], split_point).unwrap();

            prop_assert_eq!(plan.source.quantity() + plan.new_item.quantity(), quantity);
        }

        /// Monetary conservation: entry partitions sum exactly to the
        /// original amounts, with residue resolved toward the original item.
        #[test]
        fn money_is_conserved(
            quantity in 2i64..100_000,
            split_point in 1i64..100_000,
            amounts in prop::collection::vec(-1_000_000i64..1_000_000i64, 1..8),
        ) {
            prop_assume!(split_point < quantity);
            let item = test_item(quantity);
            let entries: Vec<LedgerEntry> =
                amounts.iter().map(|a| fee_entry(&item, *a)).collect();
            let refs: Vec<&LedgerEntry> = entries.iter().collect();

            let plan = plan_split(&item, &refs, split_point).unwrap();

            let before: i128 = amounts.iter().map(|a| *a as i128).sum();
            let retained: i128 = plan.retained_entries.iter().map(|e| e.amount().widened()).sum();
            let moved: i128 = plan.moved_entries.iter().map(|e| e.amount().widened()).sum();
            prop_assert_eq!(retained + moved, before);

            // The moved side never exceeds its exact proportional share.
            for (entry, moved_entry) in entries.iter().zip(&plan.moved_entries) {
                prop_assert!(
                    moved_entry.amount().widened().abs() * quantity as i128
                        <= entry.amount().widened().abs() * split_point as i128
                );
            }
        }
    }
}
