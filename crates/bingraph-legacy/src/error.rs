use thiserror::Error;

/// Errors raised while building a legacy type handler.
///
/// Every mapping problem surfaces here, at construction time. A handler
/// that was built successfully never discovers a gap while reading.
#[derive(Debug, Error)]
pub enum LegacyError {
    /// A legacy member has no translator to the member it maps to.
    #[error("cannot map member {member} of legacy type {type_name}: {reason}")]
    UnmappedLegacyMember {
        type_name: String,
        member: String,
        reason: String,
    },

    /// The current type has variable-length members, which generic
    /// translation cannot lay out.
    #[error("current type {type_name} has variable-length members")]
    UnsupportedVariableLength { type_name: String },

    /// Two legacy members map onto the same current member.
    #[error("more than one legacy member of {type_name} maps to {member}")]
    DuplicateTarget { type_name: String, member: String },

    /// A configured default does not fit the member it is for.
    #[error("invalid default for {type_name}.{member}: {reason}")]
    InvalidDefault {
        type_name: String,
        member: String,
        reason: String,
    },

    /// The current handler or a translated record failed.
    #[error("handler error: {0}")]
    Handler(#[from] bingraph_handler::HandlerError),
}

/// Result alias for legacy handler construction.
pub type LegacyResult<T> = Result<T, LegacyError>;
