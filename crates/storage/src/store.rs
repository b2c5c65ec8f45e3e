//! The normalized entity store.
//!
//! One store is created at startup and handed by reference to every
//! component that merges or resolves. It is only ever mutated through the
//! `merge*` methods; everything else is read-only.
//!
//! ## Merge semantics
//!
//! Merging is a shallow key-wise overwrite at two levels:
//!
//! - attribute keys present in the incoming resource replace the stored
//!   value (nested objects under one key are replaced wholesale);
//! - relationship names present in the incoming resource replace the stored
//!   reference, including an explicit `null`.
//!
//! Keys absent from the incoming resource are left untouched, so a sparse
//! field selection never erases fields fetched earlier. Merging is
//! idempotent, commutative across distinct resources and last-write-wins
//! for the same resource. There is no staleness detection.

use std::collections::BTreeMap;

use bazaar_interchange::{ParsedResponse, RawResource, ResourceId, ResourceRef};

use crate::denormalize::{self, Resolution, Strictness};
use crate::error::StoreError;
use crate::record::{MergeReport, StoredResource};
use crate::sanitize::FieldAllowList;
use crate::traits::EntitySource;

/// Process-wide map from (type, id) to the latest known resource data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityStore {
    buckets: BTreeMap<String, BTreeMap<ResourceId, StoredResource>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge raw resources into the store.
    pub fn merge<I>(&mut self, resources: I) -> MergeReport
    where
        I: IntoIterator<Item = RawResource>,
    {
        self.merge_batch(resources, None)
    }

    /// Merge raw resources, dropping attribute keys the allow-list does not
    /// declare for their type.
    pub fn merge_sanitized<I>(&mut self, resources: I, allow: &FieldAllowList) -> MergeReport
    where
        I: IntoIterator<Item = RawResource>,
    {
        self.merge_batch(resources, Some(allow))
    }

    /// Merge every resource of a parsed response (primary and included).
    pub fn merge_response(
        &mut self,
        response: &ParsedResponse,
        allow: Option<&FieldAllowList>,
    ) -> MergeReport {
        self.merge_batch(response.resources.iter().cloned(), allow)
    }

    fn merge_batch<I>(&mut self, resources: I, allow: Option<&FieldAllowList>) -> MergeReport
    where
        I: IntoIterator<Item = RawResource>,
    {
        let mut report = MergeReport::default();
        for mut resource in resources {
            // A resource that cannot be addressed is skipped; the rest of the
            // batch still lands.
            if resource.reference.kind.is_empty() || resource.reference.id.as_str().is_empty() {
                tracing::warn!(
                    kind = %resource.reference.kind,
                    id = %resource.reference.id,
                    "skipping resource without identity"
                );
                report.skipped += 1;
                continue;
            }
            if let Some(allow) = allow {
                report.dropped_attributes += allow.sanitize(&mut resource);
            }
            self.merge_one(resource);
            report.merged += 1;
        }
        tracing::debug!(
            merged = report.merged,
            skipped = report.skipped,
            dropped_attributes = report.dropped_attributes,
            "merged resource batch"
        );
        report
    }

    fn merge_one(&mut self, resource: RawResource) {
        let RawResource {
            reference,
            attributes,
            relationships,
        } = resource;
        let stored = self
            .buckets
            .entry(reference.kind)
            .or_default()
            .entry(reference.id)
            .or_default();
        stored.attributes.extend(attributes);
        stored.relationships.extend(relationships);
    }

    /// Latest known data for `reference`.
    pub fn get(&self, reference: &ResourceRef) -> Option<&StoredResource> {
        self.buckets.get(&reference.kind)?.get(&reference.id)
    }

    pub fn contains(&self, reference: &ResourceRef) -> bool {
        self.get(reference).is_some()
    }

    /// Number of stored resources across all types.
    pub fn len(&self) -> usize {
        self.buckets.values().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(|b| b.is_empty())
    }

    /// Resource types present in the store, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(|k| k.as_str())
    }

    /// References of every stored resource of one type, sorted by id.
    pub fn refs_of_kind(&self, kind: &str) -> Vec<ResourceRef> {
        self.buckets
            .get(kind)
            .map(|bucket| {
                bucket
                    .keys()
                    .map(|id| ResourceRef {
                        kind: kind.to_string(),
                        id: id.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Denormalize `refs` against the current contents of the store.
    pub fn resolve(
        &self,
        refs: &[ResourceRef],
        strictness: Strictness,
    ) -> Result<Resolution, StoreError> {
        denormalize::resolve(self, refs, strictness)
    }
}

impl EntitySource for EntityStore {
    fn lookup(&self, reference: &ResourceRef) -> Option<&StoredResource> {
        self.get(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_interchange::{AttrValue, Relationship};

    fn text(s: &str) -> AttrValue {
        AttrValue::Text(s.to_string())
    }

    fn listing(id: &str) -> RawResource {
        RawResource::new(ResourceRef::new("listing", id))
    }

    #[test]
    fn test_merge_creates_bucket() {
        let mut store = EntityStore::new();
        let report = store.merge(vec![listing("l1").with_attribute("title", text("A"))]);
        assert_eq!(report.merged, 1);
        assert_eq!(store.len(), 1);
        let stored = store.get(&ResourceRef::new("listing", "l1")).unwrap();
        assert_eq!(stored.attributes.get("title"), Some(&text("A")));
    }

    #[test]
    fn test_nested_object_replaced_wholesale() {
        let mut store = EntityStore::new();
        let nested = |pairs: &[(&str, &str)]| {
            AttrValue::Object(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), text(v)))
                    .collect(),
            )
        };
        store.merge(vec![listing("l1").with_attribute(
            "publicData",
            nested(&[("color", "red"), ("size", "L")]),
        )]);
        store.merge(vec![
            listing("l1").with_attribute("publicData", nested(&[("color", "blue")]))
        ]);
        let stored = store.get(&ResourceRef::new("listing", "l1")).unwrap();
        assert_eq!(
            stored.attributes.get("publicData"),
            Some(&nested(&[("color", "blue")]))
        );
    }

    #[test]
    fn test_explicit_null_relationship_overwrites() {
        let mut store = EntityStore::new();
        let author = Relationship::One(ResourceRef::new("user", "u1"));
        store.merge(vec![listing("l1").with_relationship("author", author)]);
        store.merge(vec![listing("l1").with_relationship("author", Relationship::Empty)]);
        let stored = store.get(&ResourceRef::new("listing", "l1")).unwrap();
        assert_eq!(stored.relationships.get("author"), Some(&Relationship::Empty));
    }

    #[test]
    fn test_absent_relationship_untouched() {
        let mut store = EntityStore::new();
        let author = Relationship::One(ResourceRef::new("user", "u1"));
        store.merge(vec![listing("l1").with_relationship("author", author.clone())]);
        store.merge(vec![listing("l1").with_attribute("title", text("B"))]);
        let stored = store.get(&ResourceRef::new("listing", "l1")).unwrap();
        assert_eq!(stored.relationships.get("author"), Some(&author));
    }

    #[test]
    fn test_unaddressable_resource_skipped_rest_merged() {
        let mut store = EntityStore::new();
        let report = store.merge(vec![
            RawResource::new(ResourceRef::new("", "x")),
            listing("l1"),
            RawResource::new(ResourceRef::new("listing", "")),
        ]);
        assert_eq!(report.merged, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_refs_of_kind_sorted() {
        let mut store = EntityStore::new();
        store.merge(vec![listing("b"), listing("a")]);
        assert_eq!(
            store.refs_of_kind("listing"),
            vec![ResourceRef::new("listing", "a"), ResourceRef::new("listing", "b")]
        );
        assert!(store.refs_of_kind("user").is_empty());
        assert_eq!(store.kinds().collect::<Vec<_>>(), vec!["listing"]);
    }
}
