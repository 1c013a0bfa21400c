use bingraph_types::ObjectId;
use thiserror::Error;

/// Errors from loading a chunk.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The chunk could not be split into records.
    #[error("binary layout error: {0}")]
    Binary(#[from] bingraph_binary::BinaryError),

    /// A handler rejected a record or failed to rebuild an instance.
    #[error("handler error: {0}")]
    Handler(#[from] bingraph_handler::HandlerError),

    /// A legacy handler could not be built for an outdated type id.
    #[error("legacy type error: {0}")]
    Legacy(#[from] bingraph_legacy::LegacyError),

    /// The loaded instances could not be registered.
    #[error("store error: {0}")]
    Store(#[from] bingraph_store::StoreError),

    /// The registry already holds an instance of another type under the id.
    #[error("object {object_id} is registered as {actual}, record expects {expected}")]
    InstanceTypeConflict {
        object_id: ObjectId,
        expected: String,
        actual: String,
    },
}

/// Result alias for load operations.
pub type LoaderResult<T> = Result<T, LoaderError>;
