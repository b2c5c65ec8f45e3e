//! Derived selections: the per-feature lists of references a screen keeps
//! (search results, inbox pages, own listings).
//!
//! Selections point into the store but never own its data. Clearing them,
//! e.g. on logout, leaves the store as it was.

use std::collections::{BTreeMap, HashSet};

use bazaar_interchange::{Pagination, ParsedResponse, ResourceRef};

use crate::denormalize::{resolve, Resolution, Strictness};
use crate::error::StoreError;
use crate::traits::EntitySource;

/// An ordered page (or accumulated pages) of result references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub refs: Vec<ResourceRef>,
    pub pagination: Option<Pagination>,
}

impl Selection {
    pub fn from_response(response: &ParsedResponse) -> Self {
        Selection {
            refs: response.data.clone(),
            pagination: response.meta.clone(),
        }
    }

    /// Append another page, skipping references already selected.
    pub fn extend(&mut self, next: Selection) {
        let mut seen: HashSet<ResourceRef> = self.refs.iter().cloned().collect();
        self.refs.reserve(next.refs.len());
        for reference in next.refs {
            if seen.insert(reference.clone()) {
                self.refs.push(reference);
            }
        }
        if next.pagination.is_some() {
            self.pagination = next.pagination;
        }
    }

    pub fn has_more(&self) -> bool {
        self.pagination
            .as_ref()
            .is_some_and(|p| p.page < p.total_pages)
    }

    pub fn resolve<S>(&self, source: &S, strictness: Strictness) -> Result<Resolution, StoreError>
    where
        S: EntitySource + ?Sized,
    {
        resolve(source, &self.refs, strictness)
    }
}

/// Selections keyed by feature (e.g. "inbox/sales", "search").
#[derive(Debug, Clone, Default)]
pub struct Selections {
    by_key: BTreeMap<String, Selection>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection for `key`, returning the previous one.
    pub fn set(&mut self, key: &str, selection: Selection) -> Option<Selection> {
        self.by_key.insert(key.to_string(), selection)
    }

    /// Append a page to the selection for `key`, creating it if absent.
    pub fn append(&mut self, key: &str, page: Selection) {
        self.by_key.entry(key.to_string()).or_default().extend(page);
    }

    pub fn get(&self, key: &str) -> Option<&Selection> {
        self.by_key.get(key)
    }

    /// Resolve the selection for `key`; `Ok(None)` if nothing is selected.
    pub fn resolve<S>(
        &self,
        source: &S,
        key: &str,
        strictness: Strictness,
    ) -> Result<Option<Resolution>, StoreError>
    where
        S: EntitySource + ?Sized,
    {
        self.get(key)
            .map(|selection| selection.resolve(source, strictness))
            .transpose()
    }

    pub fn clear(&mut self, key: &str) -> Option<Selection> {
        self.by_key.remove(key)
    }

    /// Drop every selection whose key starts with `prefix`.
    pub fn clear_prefix(&mut self, prefix: &str) {
        self.by_key.retain(|key, _| !key.starts_with(prefix));
    }

    pub fn clear_all(&mut self) {
        self.by_key.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.by_key.keys().map(|k| k.as_str())
    }
}
