//! Randomized merge properties over generated resource batches.

use std::collections::BTreeMap;

use bazaar_interchange::{AttrValue, RawResource, Relationship, ResourceRef};
use bazaar_store::EntityStore;
use proptest::prelude::*;
use rust_decimal::Decimal;

const KINDS: &[&str] = &["listing", "user", "review"];

fn kind() -> impl Strategy<Value = &'static str> {
    prop::sample::select(KINDS)
}

fn attr_value() -> impl Strategy<Value = AttrValue> {
    prop_oneof![
        Just(AttrValue::Null),
        any::<bool>().prop_map(AttrValue::Bool),
        "[a-z]{0,8}".prop_map(AttrValue::Text),
        (-10_000i64..10_000).prop_map(|n| AttrValue::Number(Decimal::from(n))),
    ]
}

fn attributes() -> impl Strategy<Value = BTreeMap<String, AttrValue>> {
    prop::collection::btree_map("[a-e]", attr_value(), 0..5)
}

fn target() -> impl Strategy<Value = ResourceRef> {
    (kind(), 0u8..6).prop_map(|(kind, n)| ResourceRef::new(kind, format!("t{n}")))
}

fn relationship() -> impl Strategy<Value = Relationship> {
    prop_oneof![
        Just(Relationship::Empty),
        target().prop_map(Relationship::One),
        prop::collection::vec(target(), 0..4).prop_map(Relationship::Many),
    ]
}

/// A resource whose id starts with `prefix`, so batches built from
/// different prefixes never address the same resource.
fn raw_resource(prefix: &'static str) -> impl Strategy<Value = RawResource> {
    (
        kind(),
        0u8..4,
        attributes(),
        prop::collection::btree_map("author|listing|images", relationship(), 0..3),
    )
        .prop_map(move |(kind, n, attributes, relationships)| {
            let mut resource = RawResource::new(ResourceRef::new(kind, format!("{prefix}{n}")));
            for (key, value) in attributes {
                resource = resource.with_attribute(key, value);
            }
            for (name, rel) in relationships {
                resource = resource.with_relationship(name, rel);
            }
            resource
        })
}

fn batch(prefix: &'static str) -> impl Strategy<Value = Vec<RawResource>> {
    prop::collection::vec(raw_resource(prefix), 0..8)
}

fn merged(batches: &[&Vec<RawResource>]) -> EntityStore {
    let mut store = EntityStore::new();
    for batch in batches {
        store.merge(batch.iter().cloned());
    }
    store
}

proptest! {
    #[test]
    fn merging_a_batch_twice_changes_nothing(resources in batch("a")) {
        prop_assert_eq!(merged(&[&resources]), merged(&[&resources, &resources]));
    }

    #[test]
    fn disjoint_batches_commute(left in batch("a"), right in batch("b")) {
        prop_assert_eq!(merged(&[&left, &right]), merged(&[&right, &left]));
    }

    #[test]
    fn partial_update_keeps_unmentioned_keys(
        kind_name in kind(),
        before in attributes(),
        update in attributes(),
    ) {
        let reference = ResourceRef::new(kind_name, "x");
        let with = |attributes: &BTreeMap<String, AttrValue>| {
            attributes.iter().fold(RawResource::new(reference.clone()), |r, (k, v)| {
                r.with_attribute(k.clone(), v.clone())
            })
        };
        let mut store = EntityStore::new();
        store.merge(vec![with(&before)]);
        store.merge(vec![with(&update)]);

        let stored = store.get(&reference).unwrap();
        for (key, value) in &update {
            prop_assert_eq!(stored.attributes.get(key), Some(value));
        }
        for (key, value) in before.iter().filter(|(k, _)| !update.contains_key(*k)) {
            prop_assert_eq!(stored.attributes.get(key), Some(value));
        }
        prop_assert!(stored
            .attributes
            .keys()
            .all(|k| before.contains_key(k) || update.contains_key(k)));
    }

    #[test]
    fn later_relationship_replaces_earlier(first in relationship(), second in relationship()) {
        let reference = ResourceRef::new("listing", "x");
        let mut store = EntityStore::new();
        store.merge(vec![RawResource::new(reference.clone()).with_relationship("author", first)]);
        store.merge(vec![
            RawResource::new(reference.clone()).with_relationship("author", second.clone()),
        ]);
        prop_assert_eq!(
            store.get(&reference).unwrap().relationships.get("author"),
            Some(&second)
        );
    }
}
