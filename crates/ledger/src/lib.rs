//! `lootpool-ledger` — append-only financial ledger.
//!
//! Entries are immutable once posted; every balance in the system is a
//! derived sum over them. This is the load-bearing invariant of the whole
//! engine: balances can always be recomputed, audited and replayed.

pub mod entry;
pub mod query;

pub use entry::{EntryKind, LedgerAccount, LedgerEntry};
pub use query::LedgerQuery;
