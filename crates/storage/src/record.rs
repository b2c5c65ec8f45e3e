use std::collections::BTreeMap;

use bazaar_interchange::{Attributes, Relationship};

/// The latest known attributes and relationship references of one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredResource {
    pub attributes: Attributes,
    pub relationships: BTreeMap<String, Relationship>,
}

/// Summary of one merge batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Resources written into the store.
    pub merged: usize,
    /// Resources rejected because they could not be addressed.
    pub skipped: usize,
    /// Attribute keys removed by the field allow-list.
    pub dropped_attributes: usize,
}

impl MergeReport {
    pub fn absorb(&mut self, other: MergeReport) {
        self.merged += other.merged;
        self.skipped += other.skipped;
        self.dropped_attributes += other.dropped_attributes;
    }
}
