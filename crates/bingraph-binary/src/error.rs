use thiserror::Error;

/// Errors from encoding and decoding entity records.
#[derive(Debug, Error)]
pub enum BinaryError {
    /// The bytes end before the record its header announces.
    #[error("truncated entity record at offset {offset}: {reason}")]
    TruncatedRecord { offset: u64, reason: String },

    /// The header's length or ids cannot describe a record.
    #[error("invalid entity header at offset {offset}: {reason}")]
    InvalidHeader { offset: u64, reason: String },

    /// A field read or write reaches past the payload.
    #[error("field access out of bounds: offset {offset} + {length} exceeds payload length {available}")]
    OutOfBounds {
        offset: u64,
        length: u64,
        available: u64,
    },

    /// A field was written before any entity header.
    #[error("field write without a preceding entity header")]
    NoCurrentEntity,

    /// A list's element count cannot be laid out.
    #[error("invalid list at offset {offset}: {reason}")]
    InvalidList { offset: u64, reason: String },

    /// A character list does not hold UTF-8.
    #[error("invalid UTF-8 in character list at offset {offset}")]
    InvalidUtf8 { offset: u64 },

    /// A char field holds a value that is not a Unicode scalar.
    #[error("invalid char value {0:#x}")]
    InvalidChar(u32),

    /// A length exceeds what this platform can address.
    #[error("length {0} does not fit the address space")]
    LengthOverflow(u64),
}

/// Result alias for binary layout operations.
pub type BinaryResult<T> = Result<T, BinaryError>;
