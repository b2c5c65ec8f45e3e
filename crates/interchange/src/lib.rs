//! bazaar-interchange: wire types and response flattening.
//!
//! Provides typed values for resource identity, tagged primitives
//! (money, geo-points, ids) and raw resources, and a single
//! `from_response()` entry point that flattens a `serde_json::Value`
//! envelope (`data` + side-loaded `included`) into a list of raw
//! resources ready to be merged into an entity store.

pub mod deserialize;
pub mod types;

pub use deserialize::{from_response, InterchangeError};
pub use types::*;
