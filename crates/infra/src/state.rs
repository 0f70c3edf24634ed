//! Row tables and their access discipline.
//!
//! The ledger table is append-only through [`StoreState::append_entry`];
//! the single exception is the split partition, which rewrites one item's
//! history conservation-checked at the call site. Every other table is a
//! plain keyed upsert.

use std::collections::HashMap;

use lootpool_core::{
    CharacterId, InventoryItemId, LocationId, LootGroupId, LootShareId, MarketOrderId, SoldItemId,
    StackId, TransferLogId,
};
use lootpool_inventory::{InventoryItem, Location, Stack};
use lootpool_ledger::{LedgerAccount, LedgerEntry, LedgerQuery};
use lootpool_market::{MarketOrder, SoldItem};
use lootpool_settlement::TransferLog;
use lootpool_shares::{Character, LootGroup, LootShare};

/// The complete engine state, cloned per transaction.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    characters: HashMap<CharacterId, Character>,
    locations: HashMap<LocationId, Location>,
    groups: HashMap<LootGroupId, LootGroup>,
    shares: HashMap<LootShareId, LootShare>,
    items: HashMap<InventoryItemId, InventoryItem>,
    stacks: HashMap<StackId, Stack>,
    orders: HashMap<MarketOrderId, MarketOrder>,
    sold: HashMap<SoldItemId, SoldItem>,
    entries: Vec<LedgerEntry>,
    transfer_logs: HashMap<TransferLogId, TransferLog>,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    // -- participants & groups ------------------------------------------

    pub fn upsert_character(&mut self, character: Character) {
        self.characters.insert(character.id_typed(), character);
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn upsert_location(&mut self, location: Location) {
        self.locations.insert(location.id_typed(), location);
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn upsert_group(&mut self, group: LootGroup) {
        self.groups.insert(group.id_typed(), group);
    }

    pub fn group(&self, id: LootGroupId) -> Option<&LootGroup> {
        self.groups.get(&id)
    }

    pub fn upsert_share(&mut self, share: LootShare) {
        self.shares.insert(share.id_typed(), share);
    }

    pub fn shares_for_group(&self, group: LootGroupId) -> Vec<&LootShare> {
        let mut shares: Vec<&LootShare> =
            self.shares.values().filter(|s| s.loot_group() == group).collect();
        shares.sort_by_key(|s| s.id_typed());
        shares
    }

    pub fn shares_for_character(&self, character: CharacterId) -> Vec<&LootShare> {
        let mut shares: Vec<&LootShare> = self
            .shares
            .values()
            .filter(|s| s.character() == character)
            .collect();
        shares.sort_by_key(|s| s.id_typed());
        shares
    }

    // -- inventory ------------------------------------------------------

    pub fn upsert_item(&mut self, item: InventoryItem) {
        self.items.insert(item.id_typed(), item);
    }

    pub fn item(&self, id: InventoryItemId) -> Option<&InventoryItem> {
        self.items.get(&id)
    }

    pub fn items_at(&self, location: LocationId) -> Vec<&InventoryItem> {
        let mut items: Vec<&InventoryItem> = self
            .items
            .values()
            .filter(|i| i.location() == location)
            .collect();
        items.sort_by_key(|i| i.id_typed());
        items
    }

    pub fn upsert_stack(&mut self, stack: Stack) {
        self.stacks.insert(stack.id_typed(), stack);
    }

    pub fn remove_stack(&mut self, id: StackId) {
        self.stacks.remove(&id);
    }

    pub fn stack(&self, id: StackId) -> Option<&Stack> {
        self.stacks.get(&id)
    }

    pub fn stacks_at(&self, location: LocationId) -> Vec<&Stack> {
        let mut stacks: Vec<&Stack> = self
            .stacks
            .values()
            .filter(|s| s.location() == location)
            .collect();
        stacks.sort_by_key(|s| s.id_typed());
        stacks
    }

    // -- market ---------------------------------------------------------

    pub fn upsert_order(&mut self, order: MarketOrder) {
        self.orders.insert(order.id_typed(), order);
    }

    pub fn remove_order(&mut self, id: MarketOrderId) {
        self.orders.remove(&id);
    }

    pub fn order(&self, id: MarketOrderId) -> Option<&MarketOrder> {
        self.orders.get(&id)
    }

    pub fn upsert_sold(&mut self, sold: SoldItem) {
        self.sold.insert(sold.id_typed(), sold);
    }

    pub fn sold(&self, id: SoldItemId) -> Option<&SoldItem> {
        self.sold.get(&id)
    }

    /// The open (not fully settled) sold record for an item, if any.
    ///
    /// An item can accumulate several sold records over its life: settled
    /// ones are closed and a later fill opens a new row.
    pub fn open_sold_for_item(&self, item: InventoryItemId) -> Option<&SoldItem> {
        let mut matches: Vec<&SoldItem> = self
            .sold
            .values()
            .filter(|s| s.item() == item && !s.is_fully_settled())
            .collect();
        matches.sort_by_key(|s| s.id_typed());
        matches.first().copied()
    }

    pub fn sold_items(&self) -> Vec<&SoldItem> {
        let mut sold: Vec<&SoldItem> = self.sold.values().collect();
        sold.sort_by_key(|s| s.id_typed());
        sold
    }

    // -- ledger ---------------------------------------------------------

    /// Append-only posting surface.
    pub fn append_entry(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    /// Partition one item's pool history across a split.
    ///
    /// `retained` replaces the item's current pool entries (same ids, reduced
    /// amounts) and `moved` lands on the split-off item's account. Callers
    /// guarantee the two sides sum to the removed entries exactly.
    pub fn partition_pool_entries(
        &mut self,
        item: InventoryItemId,
        retained: Vec<LedgerEntry>,
        moved: Vec<LedgerEntry>,
    ) {
        self.entries
            .retain(|e| e.account() != LedgerAccount::Pool(item));
        self.entries.extend(retained);
        self.entries.extend(moved);
    }

    pub fn ledger(&self) -> LedgerQuery<'_> {
        LedgerQuery::new(&self.entries)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    // -- transfer logs --------------------------------------------------

    pub fn insert_transfer_log(&mut self, log: TransferLog) {
        self.transfer_logs.insert(log.id_typed(), log);
    }

    pub fn transfer_log(&self, id: TransferLogId) -> Option<&TransferLog> {
        self.transfer_logs.get(&id)
    }

    pub fn transfer_logs_for(&self, seller: CharacterId) -> Vec<&TransferLog> {
        let mut logs: Vec<&TransferLog> = self
            .transfer_logs
            .values()
            .filter(|l| l.seller() == seller)
            .collect();
        logs.sort_by_key(|l| l.id_typed());
        logs
    }
}
