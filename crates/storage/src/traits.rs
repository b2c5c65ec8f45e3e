use bazaar_interchange::ResourceRef;

use crate::record::StoredResource;

/// Read access to a normalized resource map.
///
/// The denormalizer and selections only need lookups, so they work over
/// anything that can answer "what do we know about this (type, id)".
/// [`crate::EntityStore`] is the production implementation; tests and
/// scratch stores for speculative transitions use the same type.
pub trait EntitySource {
    /// Latest known data for `reference`, if it has ever been merged.
    fn lookup(&self, reference: &ResourceRef) -> Option<&StoredResource>;
}
