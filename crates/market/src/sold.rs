use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lootpool_core::{DomainError, DomainResult, Entity, InventoryItemId, Money, SoldItemId};
use lootpool_inventory::InventoryItem;
use lootpool_ledger::{EntryKind, LedgerAccount, LedgerEntry};

use crate::order::MarketOrder;

/// How a sale happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoldVia {
    InternalMarket,
    ExternalMarket,
    Contract,
}

/// Sold quantity awaiting settlement, 1:1 with its inventory item.
///
/// `transferred_quantity` only ever grows and never exceeds `quantity`;
/// the record is fully settled when the two are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoldItem {
    id: SoldItemId,
    item: InventoryItemId,
    quantity: i64,
    transferred_quantity: i64,
    sold_via: SoldVia,
    sold_at: DateTime<Utc>,
}

impl SoldItem {
    pub fn new(
        id: SoldItemId,
        item: InventoryItemId,
        quantity: i64,
        sold_via: SoldVia,
        sold_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "sold quantity must be positive, got {quantity}"
            )));
        }
        Ok(Self {
            id,
            item,
            quantity,
            transferred_quantity: 0,
            sold_via,
            sold_at,
        })
    }

    pub fn id_typed(&self) -> SoldItemId {
        self.id
    }

    pub fn item(&self) -> InventoryItemId {
        self.item
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn transferred_quantity(&self) -> i64 {
        self.transferred_quantity
    }

    pub fn sold_via(&self) -> SoldVia {
        self.sold_via
    }

    pub fn sold_at(&self) -> DateTime<Utc> {
        self.sold_at
    }

    pub fn unsettled_quantity(&self) -> i64 {
        self.quantity - self.transferred_quantity
    }

    pub fn is_fully_settled(&self) -> bool {
        self.transferred_quantity == self.quantity
    }

    /// Fold another fill of the same item into this record.
    pub fn extended_by(&self, quantity: i64) -> Self {
        debug_assert!(quantity > 0);
        Self {
            quantity: self.quantity + quantity,
            ..self.clone()
        }
    }

    /// Advance the settled amount; monotonic and capped at `quantity`.
    pub fn advanced_by(&self, quantity: i64) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "settled quantity must be positive, got {quantity}"
            )));
        }
        let transferred = self.transferred_quantity + quantity;
        if transferred > self.quantity {
            return Err(DomainError::precondition(format!(
                "cannot settle {quantity} of {} remaining units",
                self.unsettled_quantity()
            )));
        }
        Ok(Self {
            transferred_quantity: transferred,
            ..self.clone()
        })
    }
}

impl Entity for SoldItem {
    type Id = SoldItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Staged outcome of a fill against a market order.
#[derive(Debug, Clone)]
pub struct FillPlan {
    /// The order with its quantity reduced; `None` when fully consumed.
    pub order: Option<MarketOrder>,
    /// New or extended sold-item record.
    pub sold: SoldItem,
    /// The listed item moved to Sold, only when the order was fully consumed.
    pub item: Option<InventoryItem>,
    /// Positive gross-profit posting.
    pub gross_entry: LedgerEntry,
    /// Negative transaction-tax posting.
    pub tax_entry: LedgerEntry,
}

/// Plan a (possibly partial) fill: `quantity_remaining` is what the venue
/// still shows on the order after the sale event.
pub fn plan_fill(
    order: &MarketOrder,
    item: &InventoryItem,
    existing_sold: Option<&SoldItem>,
    quantity_remaining: i64,
    now: DateTime<Utc>,
) -> DomainResult<FillPlan> {
    if quantity_remaining < 0 {
        return Err(DomainError::validation(format!(
            "remaining quantity cannot be negative, got {quantity_remaining}"
        )));
    }
    if quantity_remaining >= order.quantity() {
        return Err(DomainError::validation(format!(
            "remaining {quantity_remaining} leaves nothing sold on a {} unit order",
            order.quantity()
        )));
    }

    let quantity_sold = order.quantity() - quantity_remaining;
    let gross = Money::from_widened(order.price().widened() * quantity_sold as i128)?;
    let tax = Money::floor_from_decimal(
        order
            .transaction_tax()
            .applied_to(Decimal::from(quantity_sold) * order.price().to_decimal()),
    )?;

    let account = LedgerAccount::Pool(order.item());
    let gross_entry = LedgerEntry::post(
        account,
        gross,
        EntryKind::GrossProfit,
        quantity_sold,
        format!("sold {quantity_sold} @ {}", order.price()),
        now,
    );
    let tax_entry = LedgerEntry::post(
        account,
        -tax,
        EntryKind::TransactionTax,
        quantity_sold,
        format!("transaction tax on {quantity_sold} @ {}", order.price()),
        now,
    );

    // A fully settled record is closed: its quantity already backed a
    // payout, so folding new units into it would dilute the settlement
    // scaling. New fills open a fresh record instead.
    let sold = match existing_sold {
        Some(sold) if !sold.is_fully_settled() => sold.extended_by(quantity_sold),
        _ => SoldItem::new(
            SoldItemId::new(),
            order.item(),
            quantity_sold,
            SoldVia::InternalMarket,
            now,
        )?,
    };

    let (order_after, item_after) = if quantity_remaining == 0 {
        (None, Some(item.sold()?))
    } else {
        (Some(order.with_quantity(quantity_remaining)), None)
    };

    Ok(FillPlan {
        order: order_after,
        sold,
        item: item_after,
        gross_entry,
        tax_entry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{plan_listing, PriceInfo};
    use lootpool_core::{ItemTypeId, LocationId, LootGroupId, Rate};
    use lootpool_inventory::ItemState;
    use rust_decimal_macros::dec;

    fn listed_item_and_order(quantity: i64, price: i64) -> (InventoryItem, MarketOrder) {
        let item = InventoryItem::new(
            InventoryItemId::new(),
            ItemTypeId::new(),
            LocationId::new(),
            Some(LootGroupId::new()),
            quantity,
            Utc::now(),
        )
        .unwrap();
        let plan = plan_listing(
            &item,
            PriceInfo {
                price: Money::new(price),
                broker_fee: Rate::from_percent(dec!(3)).unwrap(),
                transaction_tax: Rate::from_percent(dec!(2)).unwrap(),
            },
            Utc::now(),
        )
        .unwrap();
        (plan.listed_item, plan.order)
    }

    #[test]
    fn partial_fill_reduces_the_order() {
        let (item, order) = listed_item_and_order(10, 1000);

        let plan = plan_fill(&order, &item, None, 6, Utc::now()).unwrap();

        assert_eq!(plan.order.as_ref().unwrap().quantity(), 6);
        assert_eq!(plan.sold.quantity(), 4);
        assert!(plan.item.is_none());
        assert_eq!(plan.gross_entry.amount(), Money::new(4000));
        // floor(4 * 1000 * 2%) = 80
        assert_eq!(plan.tax_entry.amount(), Money::new(-80));
    }

    #[test]
    fn full_fill_consumes_the_order_and_marks_the_item_sold() {
        let (item, order) = listed_item_and_order(10, 1000);

        let plan = plan_fill(&order, &item, None, 0, Utc::now()).unwrap();

        assert!(plan.order.is_none());
        assert_eq!(plan.sold.quantity(), 10);
        assert_eq!(plan.item.as_ref().unwrap().state(), ItemState::Sold);
    }

    #[test]
    fn later_fills_extend_the_same_sold_record() {
        let (item, order) = listed_item_and_order(10, 1000);

        let first = plan_fill(&order, &item, None, 6, Utc::now()).unwrap();
        let second = plan_fill(
            first.order.as_ref().unwrap(),
            &item,
            Some(&first.sold),
            0,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(second.sold.id_typed(), first.sold.id_typed());
        assert_eq!(second.sold.quantity(), 10);
    }

    #[test]
    fn fills_after_full_settlement_open_a_fresh_record() {
        let (item, order) = listed_item_and_order(10, 1000);

        let first = plan_fill(&order, &item, None, 6, Utc::now()).unwrap();
        let settled = first.sold.advanced_by(4).unwrap();
        assert!(settled.is_fully_settled());

        let second = plan_fill(
            first.order.as_ref().unwrap(),
            &item,
            Some(&settled),
            0,
            Utc::now(),
        )
        .unwrap();

        assert_ne!(second.sold.id_typed(), settled.id_typed());
        assert_eq!(second.sold.quantity(), 6);
        assert_eq!(second.sold.transferred_quantity(), 0);
    }

    #[test]
    fn fill_with_nothing_sold_is_rejected() {
        let (item, order) = listed_item_and_order(10, 1000);

        assert!(plan_fill(&order, &item, None, 10, Utc::now()).is_err());
        assert!(plan_fill(&order, &item, None, -1, Utc::now()).is_err());
    }

    #[test]
    fn settlement_progress_is_monotonic_and_capped() {
        let sold = SoldItem::new(
            SoldItemId::new(),
            InventoryItemId::new(),
            10,
            SoldVia::InternalMarket,
            Utc::now(),
        )
        .unwrap();

        let advanced = sold.advanced_by(6).unwrap();
        assert_eq!(advanced.unsettled_quantity(), 4);
        assert!(advanced.advanced_by(5).is_err());
        assert!(advanced.advanced_by(4).unwrap().is_fully_settled());
    }
}
