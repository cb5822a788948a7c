//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Herd records are identified by an owner-scoped key, so the identifier
/// alone is only meaningful together with [`Entity::owner`].
pub trait Entity {
    /// Strongly-typed entity identifier (unique within one owner).
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the owner scope of this entity.
    fn owner(&self) -> crate::OwnerId;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
