use thiserror::Error;

/// Errors produced when parsing identities.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    /// The text is not a decimal id.
    #[error("invalid id literal: {0}")]
    InvalidLiteral(String),

    /// The value is reserved and cannot name an object or type.
    #[error("reserved id value: {0}")]
    Reserved(u64),
}
