use thiserror::Error;

/// Errors surfaced by the [`Persistence`](crate::Persistence) facade.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The configuration parsed but holds an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration is not valid TOML for this schema.
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration could not be written as TOML.
    #[error("configuration serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Reading a config file or writing the type dictionary failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Type registration or the type dictionary failed.
    #[error(transparent)]
    Handler(#[from] bingraph_handler::HandlerError),

    /// The object registry or the backend failed.
    #[error(transparent)]
    Store(#[from] bingraph_store::StoreError),

    /// Storing or committing a graph failed.
    #[error(transparent)]
    Storer(#[from] bingraph_storer::StorerError),

    /// Loading the backend's records failed.
    #[error(transparent)]
    Loader(#[from] bingraph_loader::LoaderError),
}

/// Result alias for facade operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;
