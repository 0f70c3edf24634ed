//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. `Money` is the
/// canonical example in this domain: two amounts of `100` are the same amount,
/// there is no notion of "which" 100 it is. Entities (`InventoryItem`,
/// `MarketOrder`, ...) are the opposite - identity first, values second.
///
/// To "modify" a value object, create a new one with the new values. This keeps
/// them safe to share and copy freely.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
