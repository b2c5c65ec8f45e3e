/// All errors that can be returned when reading from an entity store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A resource required in strict mode has not been merged.
    #[error("resource not found: {kind}/{id}")]
    NotFound { kind: String, id: String },
}

impl StoreError {
    pub(crate) fn not_found(reference: &bazaar_interchange::ResourceRef) -> Self {
        StoreError::NotFound {
            kind: reference.kind.clone(),
            id: reference.id.to_string(),
        }
    }
}
