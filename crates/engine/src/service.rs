use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use lootpool_core::{
    CharacterId, DomainError, DomainResult, InventoryItemId, ItemTypeId, LedgerEntryId,
    LocationId, LootGroupId, LootShareId, MarketOrderId, Money, Rate, SoldItemId, TransferLogId,
};
use lootpool_infra::{InMemoryStore, StoreError, StoreState};
use lootpool_inventory::{plan_split, plan_stacking, InventoryItem, Location, StackingPlan};
use lootpool_ledger::{EntryKind, LedgerAccount, LedgerEntry};
use lootpool_market::{plan_fill, plan_listing, plan_price_change, MarketOrder, PriceInfo, SoldItem};
use lootpool_settlement::{
    plan_settlement, render_deposit_command, render_transfer_command, SettlementItem, TransferLog,
};
use lootpool_shares::{calculate_participation, Character, LootGroup, LootShare, Participation};

/// The engine facade: commands mutate inside one transaction each, queries
/// read committed snapshots.
#[derive(Debug, Default)]
pub struct LootService {
    store: InMemoryStore,
}

fn from_store(err: StoreError) -> DomainError {
    match err {
        StoreError::Conflict(msg) => DomainError::conflict(msg),
        StoreError::Poisoned(msg) => DomainError::consistency(format!("store poisoned: {msg}")),
    }
}

fn name_of(state: &StoreState, character: CharacterId) -> String {
    state
        .character(character)
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| character.to_string())
}

impl LootService {
    pub fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
        }
    }

    fn transaction<T>(&self, f: impl FnOnce(&mut StoreState) -> DomainResult<T>) -> DomainResult<T> {
        let mut tx = self.store.begin().map_err(from_store)?;
        let value = f(tx.state_mut())?;
        tx.commit().map_err(from_store)?;
        Ok(value)
    }

    fn snapshot<T>(&self, f: impl FnOnce(&StoreState) -> DomainResult<T>) -> DomainResult<T> {
        self.store.with_snapshot(f).map_err(from_store)?
    }

    // -- setup surface (consumed by the external presentation layer) -----

    pub fn register_character(&self, name: impl Into<String>) -> DomainResult<CharacterId> {
        let character = Character::new(CharacterId::new(), name);
        let id = character.id_typed();
        self.transaction(|state| {
            state.upsert_character(character);
            Ok(id)
        })
    }

    pub fn register_location(
        &self,
        name: impl Into<String>,
        admins: Vec<CharacterId>,
    ) -> DomainResult<LocationId> {
        let location = Location::new(LocationId::new(), name, admins);
        let id = location.id_typed();
        self.transaction(|state| {
            state.upsert_location(location);
            Ok(id)
        })
    }

    pub fn create_loot_group(
        &self,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<LootGroupId> {
        let group = LootGroup::new(LootGroupId::new(), name, now);
        let id = group.id_typed();
        self.transaction(|state| {
            state.upsert_group(group);
            Ok(id)
        })
    }

    /// Grant (or replace) a character's share in a loot group.
    pub fn grant_share(
        &self,
        group: LootGroupId,
        character: CharacterId,
        share_quantity: u32,
        flat_percent_cut: Rate,
    ) -> DomainResult<LootShareId> {
        self.transaction(|state| {
            state.group(group).ok_or(DomainError::NotFound)?;
            state.character(character).ok_or(DomainError::NotFound)?;

            let existing = state
                .shares_for_group(group)
                .iter()
                .find(|s| s.character() == character)
                .map(|s| s.id_typed());
            let id = existing.unwrap_or_else(LootShareId::new);

            state.upsert_share(LootShare::new(
                id,
                group,
                character,
                share_quantity,
                flat_percent_cut,
            ));
            Ok(id)
        })
    }

    /// Record recovered loot at a location.
    pub fn add_loot(
        &self,
        item_type: ItemTypeId,
        location: LocationId,
        loot_group: Option<LootGroupId>,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<InventoryItemId> {
        self.transaction(|state| {
            state.location(location).ok_or(DomainError::NotFound)?;
            if let Some(group) = loot_group {
                state.group(group).ok_or(DomainError::NotFound)?;
            }

            let item = InventoryItem::new(
                InventoryItemId::new(),
                item_type,
                location,
                loot_group,
                quantity,
                now,
            )?;
            let id = item.id_typed();
            state.upsert_item(item);
            Ok(id)
        })
    }

    // -- inventory commands ----------------------------------------------

    /// Split `new_quantity` units off an editable item.
    pub fn split(
        &self,
        item_id: InventoryItemId,
        new_quantity: i64,
    ) -> DomainResult<InventoryItemId> {
        let new_id = self.transaction(|state| {
            let item = state.item(item_id).ok_or(DomainError::NotFound)?.clone();
            Self::apply_split(state, &item, new_quantity)
        })?;
        tracing::info!(%item_id, %new_id, new_quantity, "item split");
        Ok(new_id)
    }

    fn apply_split(
        state: &mut StoreState,
        item: &InventoryItem,
        new_quantity: i64,
    ) -> DomainResult<InventoryItemId> {
        let pool_entries: Vec<LedgerEntry> = state
            .ledger()
            .pool_entries(item.id_typed())
            .cloned()
            .collect();
        let entry_refs: Vec<&LedgerEntry> = pool_entries.iter().collect();

        let plan = plan_split(item, &entry_refs, new_quantity)?;
        let new_id = plan.new_item.id_typed();

        state.partition_pool_entries(
            item.id_typed(),
            plan.retained_entries,
            plan.moved_entries,
        );
        state.upsert_item(plan.source);
        state.upsert_item(plan.new_item);
        Ok(new_id)
    }

    /// Merge same-type items at a location into stacks. Idempotent.
    pub fn stack_location(&self, location: LocationId, now: DateTime<Utc>) -> DomainResult<StackingPlan> {
        self.transaction(|state| {
            state.location(location).ok_or(DomainError::NotFound)?;

            let items: Vec<InventoryItem> =
                state.items_at(location).into_iter().cloned().collect();
            let stacks: Vec<_> = state.stacks_at(location).into_iter().cloned().collect();

            let plan = plan_stacking(location, &items, &stacks, now);

            for stack in &plan.created {
                state.upsert_stack(stack.clone());
            }
            for (item_id, stack_id) in &plan.assignments {
                let item = state.item(*item_id).ok_or(DomainError::NotFound)?.clone();
                state.upsert_item(item.with_stack(Some(*stack_id)));
            }
            for stack_id in &plan.destroyed {
                state.remove_stack(*stack_id);
            }
            Ok(plan)
        })
    }

    /// Discard an editable item's remaining quantity.
    pub fn junk(&self, item_id: InventoryItemId) -> DomainResult<()> {
        self.transaction(|state| {
            let item = state.item(item_id).ok_or(DomainError::NotFound)?.clone();
            state.upsert_item(item.junked()?);
            Ok(())
        })
    }

    // -- market commands -------------------------------------------------

    /// List `quantity` units of an item for sale, splitting first when the
    /// item holds more than is being listed.
    pub fn list_for_sale(
        &self,
        item_id: InventoryItemId,
        price_info: PriceInfo,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<MarketOrderId> {
        let order_id = self.transaction(|state| {
            let item = state.item(item_id).ok_or(DomainError::NotFound)?.clone();

            if quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "zero-quantity sale: {quantity} units"
                )));
            }
            if quantity > item.quantity() {
                return Err(DomainError::precondition(format!(
                    "insufficient quantity: {quantity} of {} units",
                    item.quantity()
                )));
            }
            item.ensure_editable()?;

            let target = if quantity < item.quantity() {
                let new_id = Self::apply_split(state, &item, quantity)?;
                state.item(new_id).ok_or(DomainError::NotFound)?.clone()
            } else {
                item
            };

            let plan = plan_listing(&target, price_info, now)?;
            let order_id = plan.order.id_typed();

            state.upsert_item(plan.listed_item);
            state.upsert_order(plan.order);
            state.append_entry(plan.fee_entry);
            Ok(order_id)
        })?;
        tracing::info!(%item_id, %order_id, quantity, "item listed for sale");
        Ok(order_id)
    }

    /// Change the price on a live order. Requires admin rights on the
    /// item's location; rejected with no mutation otherwise.
    pub fn change_price(
        &self,
        actor: CharacterId,
        order_id: MarketOrderId,
        new_price: Money,
        broker_fee: Rate,
        now: DateTime<Utc>,
    ) -> DomainResult<Money> {
        self.transaction(|state| {
            let order = state.order(order_id).ok_or(DomainError::NotFound)?.clone();
            let item = state.item(order.item()).ok_or(DomainError::NotFound)?;
            let location = state.location(item.location()).ok_or(DomainError::NotFound)?;

            if !location.is_admin(actor) {
                return Err(DomainError::Unauthorized);
            }

            let plan = plan_price_change(&order, new_price, broker_fee, now)?;
            let fee = plan.fee_entry.amount();

            state.append_entry(plan.fee_entry);
            state.upsert_order(plan.order);
            Ok(fee)
        })
    }

    /// Record a sale event from the venue: the order now shows
    /// `quantity_remaining` units.
    pub fn mark_sold(
        &self,
        order_id: MarketOrderId,
        quantity_remaining: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<SoldItemId> {
        let sold_id = self.transaction(|state| {
            let order = state.order(order_id).ok_or(DomainError::NotFound)?.clone();
            let item = state.item(order.item()).ok_or(DomainError::NotFound)?.clone();
            let existing = state.open_sold_for_item(order.item()).cloned();

            let plan = plan_fill(&order, &item, existing.as_ref(), quantity_remaining, now)?;
            let sold_id = plan.sold.id_typed();

            match plan.order {
                Some(reduced) => state.upsert_order(reduced),
                None => state.remove_order(order_id),
            }
            if let Some(sold_item) = plan.item {
                state.upsert_item(sold_item);
            }
            state.upsert_sold(plan.sold);
            state.append_entry(plan.gross_entry);
            state.append_entry(plan.tax_entry);
            Ok(sold_id)
        })?;
        tracing::info!(%order_id, %sold_id, quantity_remaining, "sale recorded");
        Ok(sold_id)
    }

    // -- ledger commands -------------------------------------------------

    /// Manual correction surface: buybacks, debts, credits and deposits.
    /// Engine-reserved kinds (fees, profit, remainders) are rejected.
    pub fn post_adjustment(
        &self,
        account: LedgerAccount,
        amount: Money,
        kind: EntryKind,
        note: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<LedgerEntryId> {
        if !matches!(
            kind,
            EntryKind::Buyback | EntryKind::Debt | EntryKind::Credit | EntryKind::Deposit
        ) {
            return Err(DomainError::validation(format!(
                "entry kind {kind:?} is reserved for engine flows"
            )));
        }

        let entry = LedgerEntry::post(account, amount, kind, 0, note, now);
        let id = entry.id_typed();
        self.transaction(|state| {
            state.append_entry(entry);
            Ok(id)
        })
    }

    // -- settlement ------------------------------------------------------

    /// Settle every unsettled sold item on behalf of `seller`.
    ///
    /// Atomic across the whole batch; returns `Ok(None)` when nothing is
    /// unsettled (re-running settlement is a no-op). The rendered transfer
    /// and deposit instructions are recorded as a [`TransferLog`] for the
    /// external messaging collaborator - the engine never delivers them.
    pub fn settle(
        &self,
        seller: CharacterId,
        keep_own_share_as_credit: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<TransferLog>> {
        let log = self.transaction(|state| {
            state.character(seller).ok_or(DomainError::NotFound)?;

            let mut batch = Vec::new();
            let mut groups = BTreeSet::new();
            for sold in state.sold_items() {
                if sold.unsettled_quantity() == 0 {
                    continue;
                }
                let item = state.item(sold.item()).ok_or_else(|| {
                    DomainError::consistency(format!("sold record {} has no item row", sold.id_typed()))
                })?;
                let group = item.loot_group().ok_or_else(|| {
                    DomainError::consistency(format!(
                        "item {} is not linked to a loot group",
                        item.id_typed()
                    ))
                })?;
                groups.insert(group);
                batch.push(SettlementItem {
                    sold: sold.clone(),
                    loot_group: group,
                    pool_balance: state.ledger().pool_balance(sold.item()),
                });
            }

            let stakes_by_group: BTreeMap<_, _> = groups
                .into_iter()
                .map(|g| {
                    let stakes = state
                        .shares_for_group(g)
                        .iter()
                        .map(|s| s.to_stake())
                        .collect::<Vec<_>>();
                    (g, stakes)
                })
                .collect();

            let Some(plan) =
                plan_settlement(&batch, &stakes_by_group, seller, keep_own_share_as_credit, now)?
            else {
                return Ok(None);
            };

            for entry in &plan.entries {
                state.append_entry(entry.clone());
            }
            for sold in &plan.settled_sold {
                state.upsert_sold(sold.clone());
            }

            let totals: Vec<(String, Money)> = plan
                .payouts
                .iter()
                .filter(|(_, amount)| !amount.is_zero())
                .map(|(character, amount)| (name_of(state, *character), *amount))
                .collect();
            let seller_name = name_of(state, seller);

            let log = TransferLog::new(
                TransferLogId::new(),
                seller,
                plan.total_settled,
                plan.item_count,
                render_deposit_command(
                    plan.others_share,
                    plan.own_share,
                    keep_own_share_as_credit,
                    plan.leftover,
                ),
                render_transfer_command(&totals, &seller_name),
                now,
            );
            state.insert_transfer_log(log.clone());
            Ok(Some(log))
        })?;

        if let Some(log) = &log {
            tracing::info!(
                %seller,
                total = %log.total_amount(),
                items = log.item_count(),
                "settlement committed"
            );
        }
        Ok(log)
    }

    /// Tick a transfer log's checklist marker. No balance effect.
    pub fn mark_transfer_done(&self, log_id: TransferLogId) -> DomainResult<()> {
        self.transaction(|state| {
            let log = state.transfer_log(log_id).ok_or(DomainError::NotFound)?.clone();
            state.insert_transfer_log(log.marked_done());
            Ok(())
        })
    }

    // -- queries (committed snapshots, lock-free vs. writers) ------------

    /// Derived pool balance of an item.
    pub fn balance(&self, item_id: InventoryItemId) -> DomainResult<i128> {
        self.snapshot(|state| {
            state.item(item_id).ok_or(DomainError::NotFound)?;
            Ok(state.ledger().pool_balance(item_id))
        })
    }

    /// Derived credit-ledger balance of a character.
    pub fn credit_balance(&self, character: CharacterId) -> DomainResult<i128> {
        self.snapshot(|state| {
            state.character(character).ok_or(DomainError::NotFound)?;
            Ok(state.ledger().credit_balance(character))
        })
    }

    /// Preview a group's split of a hypothetical profit. Pure; posts nothing.
    pub fn participation(
        &self,
        group: LootGroupId,
        profit: i128,
    ) -> DomainResult<Participation> {
        self.snapshot(|state| {
            state.group(group).ok_or(DomainError::NotFound)?;
            let stakes: Vec<_> = state
                .shares_for_group(group)
                .iter()
                .map(|s| s.to_stake())
                .collect();
            calculate_participation(profit, &stakes)
        })
    }

    /// Sold items still owing quantity to groups the character shares in.
    pub fn unsettled_items(&self, character: CharacterId) -> DomainResult<Vec<SoldItem>> {
        self.snapshot(|state| {
            state.character(character).ok_or(DomainError::NotFound)?;

            let groups: BTreeSet<LootGroupId> = state
                .shares_for_character(character)
                .iter()
                .map(|s| s.loot_group())
                .collect();

            let unsettled = state
                .sold_items()
                .into_iter()
                .filter(|sold| sold.unsettled_quantity() > 0)
                .filter(|sold| {
                    state
                        .item(sold.item())
                        .and_then(InventoryItem::loot_group)
                        .is_some_and(|g| groups.contains(&g))
                })
                .cloned()
                .collect();
            Ok(unsettled)
        })
    }

    pub fn transfer_logs(&self, seller: CharacterId) -> DomainResult<Vec<TransferLog>> {
        self.snapshot(|state| {
            Ok(state
                .transfer_logs_for(seller)
                .into_iter()
                .cloned()
                .collect())
        })
    }

    // -- row lookups for presentation ------------------------------------

    pub fn item(&self, id: InventoryItemId) -> DomainResult<Option<InventoryItem>> {
        self.snapshot(|state| Ok(state.item(id).cloned()))
    }

    pub fn order(&self, id: MarketOrderId) -> DomainResult<Option<MarketOrder>> {
        self.snapshot(|state| Ok(state.order(id).cloned()))
    }

    pub fn sold_item(&self, id: SoldItemId) -> DomainResult<Option<SoldItem>> {
        self.snapshot(|state| Ok(state.sold(id).cloned()))
    }

    pub fn transfer_log(&self, id: TransferLogId) -> DomainResult<Option<TransferLog>> {
        self.snapshot(|state| Ok(state.transfer_log(id).cloned()))
    }
}
