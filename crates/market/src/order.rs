use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lootpool_core::{
    DomainError, DomainResult, Entity, InventoryItemId, MarketOrderId, Money, Rate, ValueObject,
};
use lootpool_inventory::InventoryItem;
use lootpool_ledger::{EntryKind, LedgerAccount, LedgerEntry};

/// Pricing terms for a listing: unit price plus the venue's fee rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceInfo {
    pub price: Money,
    pub broker_fee: Rate,
    pub transaction_tax: Rate,
}

impl ValueObject for PriceInfo {}

/// Listed-for-sale quantity, 1:1 with its source inventory item.
///
/// `quantity <= item.quantity` is deliberately NOT an invariant: the listed
/// quantity was already moved off the item when the order was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrder {
    id: MarketOrderId,
    item: InventoryItemId,
    quantity: i64,
    price: Money,
    broker_fee: Rate,
    transaction_tax: Rate,
    listed_at: DateTime<Utc>,
}

impl MarketOrder {
    pub fn id_typed(&self) -> MarketOrderId {
        self.id
    }

    pub fn item(&self) -> InventoryItemId {
        self.item
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn broker_fee(&self) -> Rate {
        self.broker_fee
    }

    pub fn transaction_tax(&self) -> Rate {
        self.transaction_tax
    }

    pub fn listed_at(&self) -> DateTime<Utc> {
        self.listed_at
    }

    pub(crate) fn with_price(&self, price: Money) -> Self {
        Self {
            price,
            ..self.clone()
        }
    }

    pub(crate) fn with_quantity(&self, quantity: i64) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }
}

impl Entity for MarketOrder {
    type Id = MarketOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Staged outcome of listing an item for sale.
#[derive(Debug, Clone)]
pub struct ListingPlan {
    /// The item with its quantity zeroed and state moved to Listed.
    pub listed_item: InventoryItem,
    pub order: MarketOrder,
    /// Negative broker-fee posting against the item's pool account.
    pub fee_entry: LedgerEntry,
}

/// Plan listing the item's full quantity at the given terms.
///
/// Callers wanting a partial sale split the item first; by the time this
/// runs, the item holds exactly the quantity being listed. The broker fee is
/// `floor(quantity * price * broker_fee%)`, posted negative.
pub fn plan_listing(
    item: &InventoryItem,
    price_info: PriceInfo,
    now: DateTime<Utc>,
) -> DomainResult<ListingPlan> {
    let quantity = item.quantity();
    if quantity <= 0 {
        return Err(DomainError::validation(format!(
            "zero-quantity sale: nothing to list on item {}",
            item.id_typed()
        )));
    }

    let listed_item = item.listed()?;

    let gross = Decimal::from(quantity) * price_info.price.to_decimal();
    let fee = Money::floor_from_decimal(price_info.broker_fee.applied_to(gross))?;

    let order = MarketOrder {
        id: MarketOrderId::new(),
        item: item.id_typed(),
        quantity,
        price: price_info.price,
        broker_fee: price_info.broker_fee,
        transaction_tax: price_info.transaction_tax,
        listed_at: now,
    };

    let fee_entry = LedgerEntry::post(
        LedgerAccount::Pool(item.id_typed()),
        -fee,
        EntryKind::BrokerFee,
        quantity,
        format!("broker fee for listing {quantity} @ {}", price_info.price),
        now,
    );

    Ok(ListingPlan {
        listed_item,
        order,
        fee_entry,
    })
}

/// Staged outcome of a price change.
#[derive(Debug, Clone)]
pub struct PriceChangePlan {
    pub order: MarketOrder,
    /// Negative price-change-fee posting, computed before the update.
    pub fee_entry: LedgerEntry,
}

/// Plan a price change on a live order.
///
/// The adjustment fee mirrors what the venue charges for relisting: on a
/// decrease `floor(new_price * quantity * broker_fee% / 2)`, on an increase
/// `floor((new_price - old_price/2) * quantity * broker_fee%)`. An unchanged
/// price is rejected with no staged mutation.
pub fn plan_price_change(
    order: &MarketOrder,
    new_price: Money,
    broker_fee: Rate,
    now: DateTime<Utc>,
) -> DomainResult<PriceChangePlan> {
    let old_price = order.price();
    if new_price == old_price {
        return Err(DomainError::validation("price unchanged"));
    }

    let quantity = Decimal::from(order.quantity());
    let two = Decimal::from(2);

    let fee = if new_price < old_price {
        broker_fee.applied_to(new_price.to_decimal() * quantity) / two
    } else {
        broker_fee.applied_to((new_price.to_decimal() - old_price.to_decimal() / two) * quantity)
    };
    let fee = Money::floor_from_decimal(fee)?;

    let fee_entry = LedgerEntry::post(
        LedgerAccount::Pool(order.item()),
        -fee,
        EntryKind::PriceChangeFee,
        order.quantity(),
        format!("price change {old_price} -> {new_price}"),
        now,
    );

    Ok(PriceChangePlan {
        order: order.with_price(new_price),
        fee_entry,
    })
}
