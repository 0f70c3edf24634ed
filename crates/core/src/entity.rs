//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// An entity keeps its identity while its values change: an `InventoryItem`
/// stays the same item as its quantity drains to zero, and a `SoldItem` stays
/// the same record while `transferred_quantity` advances. Compare by id, not
/// by field values.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
