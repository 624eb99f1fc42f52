//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Identities are assigned by the store. A freshly constructed entity carries
/// the zero id until it has been persisted.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug + From<i64> + Into<i64>;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Overwrites the identifier (used once the store has assigned one).
    fn assign_id(&mut self, id: Self::Id);

    /// Whether the entity has been given a store-assigned identity.
    fn is_persisted(&self) -> bool {
        self.id().into() > 0
    }
}
