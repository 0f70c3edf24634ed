//! `lootpool-market` — listed-for-sale quantity and its fills.
//!
//! A market order is coupled 1:1 to the inventory item it was listed from;
//! the item's quantity moves onto the order at listing time. Fees and fills
//! are staged as plans and applied by the engine inside one transaction.

pub mod order;
pub mod sold;

pub use order::{plan_listing, plan_price_change, ListingPlan, MarketOrder, PriceChangePlan, PriceInfo};
pub use sold::{plan_fill, FillPlan, SoldItem, SoldVia};
