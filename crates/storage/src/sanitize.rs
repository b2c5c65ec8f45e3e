//! Attribute allow-lists derived from the app's field configuration.
//!
//! Types without an entry are passed through untouched.

use std::collections::{BTreeMap, BTreeSet};

use bazaar_interchange::RawResource;

/// Per-type set of attribute keys the app declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAllowList {
    per_kind: BTreeMap<String, BTreeSet<String>>,
}

impl FieldAllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[fields]` table of the configuration file.
    pub fn from_config(fields: &BTreeMap<String, Vec<String>>) -> Self {
        let mut list = Self::new();
        for (kind, keys) in fields {
            list.allow(kind, keys.iter().map(|k| k.as_str()));
        }
        list
    }

    /// Declare allowed keys for a type. Repeated calls accumulate.
    pub fn allow<'a>(&mut self, kind: &str, keys: impl IntoIterator<Item = &'a str>) {
        self.per_kind
            .entry(kind.to_string())
            .or_default()
            .extend(keys.into_iter().map(|k| k.to_string()));
    }

    pub fn filters(&self, kind: &str) -> bool {
        self.per_kind.contains_key(kind)
    }

    pub fn is_allowed(&self, kind: &str, key: &str) -> bool {
        self.per_kind
            .get(kind)
            .map_or(true, |allowed| allowed.contains(key))
    }

    /// Remove undeclared attribute keys; returns how many were dropped.
    pub fn sanitize(&self, resource: &mut RawResource) -> usize {
        let Some(allowed) = self.per_kind.get(&resource.reference.kind) else {
            return 0;
        };
        let before = resource.attributes.len();
        resource.attributes.retain(|key, _| allowed.contains(key));
        let dropped = before - resource.attributes.len();
        if dropped > 0 {
            tracing::debug!(
                resource = %resource.reference,
                dropped,
                "dropped undeclared attributes"
            );
        }
        dropped
    }
}
