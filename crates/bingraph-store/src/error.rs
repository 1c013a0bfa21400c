use bingraph_types::ObjectId;

/// Errors from the object registry and persistence targets.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The target does not accept writes.
    #[error("persistence target is read-only")]
    ReadOnly,

    /// I/O error from a file-backed target.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An id is already bound to a different live instance, or the
    /// instance already has a different id.
    #[error("object id conflict for {id}: {reason}")]
    ObjectIdConflict { id: ObjectId, reason: String },

    /// Null and the not-found sentinel cannot be registered.
    #[error("cannot register reserved object id {0:?}")]
    ReservedObjectId(ObjectId),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
