//! bazaar-store: the normalized, in-memory entity graph cache.
//!
//! Raw resources flattened by `bazaar-interchange` are merged into an
//! [`EntityStore`]; screens read nested entities back out through
//! [`EntityStore::resolve`]. The store is single-writer and lives for the
//! lifetime of the client process; there is no eviction.

pub mod denormalize;
mod error;
mod record;
pub mod sanitize;
pub mod selection;
pub mod store;
mod traits;

pub use denormalize::{resolve, Entity, Link, NodeId, Resolution, ResolvedGraph, Strictness};
pub use error::StoreError;
pub use record::{MergeReport, StoredResource};
pub use sanitize::FieldAllowList;
pub use selection::{Selection, Selections};
pub use store::EntityStore;
pub use traits::EntitySource;
