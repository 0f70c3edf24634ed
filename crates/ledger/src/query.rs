//! Ledger-query service: balances as derived sums.
//!
//! Everything that wants to know "what is this account worth" comes through
//! here, so nothing else in the engine is tempted to keep a mutable balance
//! field. Sums are widened to `i128` before accumulation.

use lootpool_core::{CharacterId, InventoryItemId};

use crate::entry::{LedgerAccount, LedgerEntry};

/// Read-side queries over a slice of committed ledger entries.
#[derive(Debug, Clone, Copy)]
pub struct LedgerQuery<'a> {
    entries: &'a [LedgerEntry],
}

impl<'a> LedgerQuery<'a> {
    pub fn new(entries: &'a [LedgerEntry]) -> Self {
        Self { entries }
    }

    pub fn account_balance(&self, account: LedgerAccount) -> i128 {
        self.entries
            .iter()
            .filter(|e| e.account() == account)
            .map(|e| e.amount().widened())
            .sum()
    }

    /// Balance of an item's pool account.
    pub fn pool_balance(&self, item: InventoryItemId) -> i128 {
        self.account_balance(LedgerAccount::Pool(item))
    }

    /// Balance of a character's credit ledger.
    pub fn credit_balance(&self, character: CharacterId) -> i128 {
        self.account_balance(LedgerAccount::Credit(character))
    }

    pub fn pool_entries(&self, item: InventoryItemId) -> impl Iterator<Item = &'a LedgerEntry> {
        self.entries
            .iter()
            .filter(move |e| e.account() == LedgerAccount::Pool(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;
    use chrono::Utc;
    use lootpool_core::Money;
    use proptest::prelude::*;

    #[test]
    fn balance_sums_only_the_requested_account() {
        let item = InventoryItemId::new();
        let other = InventoryItemId::new();
        let character = CharacterId::new();
        let now = Utc::now();

        let entries = vec![
            LedgerEntry::post(
                LedgerAccount::Pool(item),
                Money::new(10_000),
                EntryKind::GrossProfit,
                5,
                "sale",
                now,
            ),
            LedgerEntry::post(
                LedgerAccount::Pool(item),
                Money::new(-300),
                EntryKind::BrokerFee,
                5,
                "listing fee",
                now,
            ),
            LedgerEntry::post(
                LedgerAccount::Pool(other),
                Money::new(777),
                EntryKind::GrossProfit,
                1,
                "",
                now,
            ),
            LedgerEntry::post(
                LedgerAccount::Credit(character),
                Money::new(4_850),
                EntryKind::Credit,
                0,
                "payout",
                now,
            ),
        ];

        let query = LedgerQuery::new(&entries);
        assert_eq!(query.pool_balance(item), 9_700);
        assert_eq!(query.pool_balance(other), 777);
        assert_eq!(query.credit_balance(character), 4_850);
    }

    #[test]
    fn corrections_are_offsetting_entries() {
        let item = InventoryItemId::new();
        let now = Utc::now();

        let entries = vec![
            LedgerEntry::post(
                LedgerAccount::Pool(item),
                Money::new(-500),
                EntryKind::TransactionTax,
                1,
                "tax posted twice by mistake",
                now,
            ),
            LedgerEntry::post(
                LedgerAccount::Pool(item),
                Money::new(500),
                EntryKind::TransactionTax,
                1,
                "offset duplicate tax",
                now,
            ),
        ];

        assert_eq!(LedgerQuery::new(&entries).pool_balance(item), 0);
    }

    proptest! {
        /// Property: the derived balance equals the plain sum of the account's
        /// amounts, however pool and credit entries are interleaved.
        #[test]
        fn balance_is_the_sum_of_amounts(
            amounts in prop::collection::vec((-1_000_000i64..1_000_000i64, prop::bool::ANY), 0..40)
        ) {
            let item = InventoryItemId::new();
            let character = CharacterId::new();
            let now = Utc::now();

            let mut expected: i128 = 0;
            let mut entries = Vec::new();
            for (amount, to_pool) in amounts {
                let account = if to_pool {
                    expected += amount as i128;
                    LedgerAccount::Pool(item)
                } else {
                    LedgerAccount::Credit(character)
                };
                entries.push(LedgerEntry::post(
                    account,
                    Money::new(amount),
                    EntryKind::Deposit,
                    1,
                    "",
                    now,
                ));
            }

            prop_assert_eq!(LedgerQuery::new(&entries).pool_balance(item), expected);
        }
    }
}
