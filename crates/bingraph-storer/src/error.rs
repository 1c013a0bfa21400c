use thiserror::Error;

/// Errors from storing and committing a graph.
#[derive(Debug, Error)]
pub enum StorerError {
    /// A type handler failed to register or write an instance.
    #[error("handler error: {0}")]
    Handler(#[from] bingraph_handler::HandlerError),

    /// The object registry or the target failed.
    #[error("store error: {0}")]
    Store(#[from] bingraph_store::StoreError),

    /// A previous store or commit failed; the storer must be cleared.
    #[error("storer aborted by an earlier failure; clear it before reuse")]
    Aborted,
}

/// Result alias for storer operations.
pub type StorerResult<T> = Result<T, StorerError>;
