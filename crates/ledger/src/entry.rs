use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lootpool_core::{CharacterId, Entity, InventoryItemId, LedgerEntryId, Money};

/// Which ledger an entry is posted against.
///
/// Pool entries belong to exactly one inventory item and carry that item's
/// financial history through listing, sale and settlement. Credit entries
/// form the per-character credit ledger that settlement pays into.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerAccount {
    Pool(InventoryItemId),
    Credit(CharacterId),
}

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    BrokerFee,
    TransactionTax,
    GrossProfit,
    PriceChangeFee,
    Deposit,
    FractionalRemainder,
    Buyback,
    Debt,
    Credit,
}

/// One immutable ledger row.
///
/// There is no update or delete in the public contract; corrections are
/// modeled as new offsetting entries. Amounts may be negative (fees) or
/// positive (profit/deposits).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    id: LedgerEntryId,
    account: LedgerAccount,
    amount: Money,
    quantity: i64,
    kind: EntryKind,
    note: String,
    posted_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Append a new entry with a freshly minted id.
    pub fn post(
        account: LedgerAccount,
        amount: Money,
        kind: EntryKind,
        quantity: i64,
        note: impl Into<String>,
        posted_at: DateTime<Utc>,
    ) -> Self {
        Self::with_id(LedgerEntryId::new(), account, amount, kind, quantity, note, posted_at)
    }

    /// Construct with an explicit id.
    ///
    /// Used by split proration (the retained half keeps its original id) and
    /// by tests that need determinism.
    pub fn with_id(
        id: LedgerEntryId,
        account: LedgerAccount,
        amount: Money,
        kind: EntryKind,
        quantity: i64,
        note: impl Into<String>,
        posted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account,
            amount,
            kind,
            quantity,
            note: note.into(),
            posted_at,
        }
    }

    pub fn id_typed(&self) -> LedgerEntryId {
        self.id
    }

    pub fn account(&self) -> LedgerAccount {
        self.account
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn posted_at(&self) -> DateTime<Utc> {
        self.posted_at
    }

    /// Partition this entry for an item split of `moved_quantity` out of
    /// `original_quantity` units.
    ///
    /// The moved part is prorated truncating toward zero; whatever the
    /// truncation drops stays on the retained side, so the two parts always
    /// sum exactly to the original amount and quantity. Kind, note and
    /// timestamp carry over unchanged - the history is partitioned, not
    /// rewritten.
    pub fn partitioned(
        &self,
        moved_account: LedgerAccount,
        moved_quantity: i64,
        original_quantity: i64,
    ) -> (LedgerEntry, LedgerEntry) {
        debug_assert!(original_quantity > 0 && (0..=original_quantity).contains(&moved_quantity));

        let moved_amount =
            (self.amount.widened() * moved_quantity as i128 / original_quantity as i128) as i64;
        let moved_qty =
            (self.quantity as i128 * moved_quantity as i128 / original_quantity as i128) as i64;

        let retained = LedgerEntry::with_id(
            self.id,
            self.account,
            Money::new(self.amount.minor() - moved_amount),
            self.kind,
            self.quantity - moved_qty,
            self.note.clone(),
            self.posted_at,
        );
        let moved = LedgerEntry::post(
            moved_account,
            Money::new(moved_amount),
            self.kind,
            moved_qty,
            self.note.clone(),
            self.posted_at,
        );
        (retained, moved)
    }
}

impl Entity for LedgerEntry {
    type Id = LedgerEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
