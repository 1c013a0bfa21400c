use bingraph_binary::BinaryError;
use bingraph_types::{ObjectId, TypeId};
use thiserror::Error;

/// Errors raised by type handlers and the handler registry.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The type is explicitly excluded from persistence.
    #[error("type is not persistable: {type_name}")]
    TypeNotPersistable { type_name: String },

    /// An instance disagrees with the bytes meant to represent it.
    #[error("inconsistent state of {type_name} instance {object_id}: {reason}")]
    InconsistentState {
        type_name: String,
        object_id: ObjectId,
        reason: String,
    },

    /// A record's payload length lies outside the handler's bounds.
    #[error(
        "record {object_id} of type {type_id} has payload length {length}, \
         expected {minimum}..={maximum}"
    )]
    InvalidRecordLength {
        type_id: TypeId,
        object_id: ObjectId,
        length: u64,
        minimum: u64,
        maximum: u64,
    },

    /// A record's list headers run past its payload.
    #[error("record {object_id} of type {type_id} is malformed: {source}")]
    MalformedRecord {
        type_id: TypeId,
        object_id: ObjectId,
        #[source]
        source: BinaryError,
    },

    /// An instance was handed to the handler of another type.
    #[error("instance type mismatch: handler for {expected} got {actual}")]
    InstanceTypeMismatch { expected: String, actual: String },

    /// No handler is registered for the runtime type or type name.
    #[error("no type handler registered for {0}")]
    NoTypeHandler(String),

    /// Neither a handler nor the type dictionary knows the type id.
    #[error("unknown type id: {0}")]
    UnknownTypeId(TypeId),

    /// The instance must never reach a storer directly.
    #[error("unsupported instance of {type_name}: {reason}")]
    UnsupportedInstance { type_name: String, reason: String },

    /// A record references an object that is neither loaded nor registered.
    #[error("unresolved reference to object {0}")]
    UnresolvedReference(ObjectId),

    /// A second handler was registered for the same type.
    #[error("a handler is already registered for {0}")]
    DuplicateHandler(String),

    /// The type id is already taken.
    #[error("type id {0} is already bound to a different definition")]
    DuplicateTypeId(TypeId),

    /// A map entry whose key is null or not a `String`.
    #[error("unsupported map key: {0}")]
    UnsupportedKey(String),

    /// Encoding or decoding a record failed.
    #[error("binary layout error: {0}")]
    Binary(#[from] BinaryError),

    /// The type dictionary could not be read or written as JSON.
    #[error("type dictionary error: {0}")]
    Dictionary(#[from] serde_json::Error),
}

/// Result alias for handler operations.
pub type HandlerResult<T> = Result<T, HandlerError>;
