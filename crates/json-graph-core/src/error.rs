//! Error types for graph encoding and decoding.

use thiserror::Error;

/// Errors raised while turning a live value into its plain form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    /// NaN or an infinity was met and no `"Number"` handler is registered.
    #[error("no handler registered for non-finite number {0}")]
    NonFiniteNumber(f64),
    /// A mapping or instance field uses one of the reserved wire keys.
    #[error("key {0:?} is reserved by the graph encoding")]
    ReservedKey(String),
    /// Nesting exceeded `CodecOptions::max_depth`.
    #[error("maximum nesting depth of {0} exceeded")]
    DepthExceeded(usize),
    /// A registered handler refused the value.
    #[error("handler for {tag} failed: {message}")]
    Handler { tag: String, message: String },
}

/// A plain value that is not a consistent graph encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedInput {
    /// A reserved reference marker whose index is not a non-negative integer.
    #[error("invalid reference marker {0:?}")]
    InvalidReference(String),
    /// A back-reference to an index no container was registered under.
    #[error("back-reference to unknown index {0}")]
    UnresolvedReference(usize),
    /// Two containers claim the same reference index.
    #[error("reference index {0} registered twice")]
    DuplicateReference(usize),
    /// The constructor key holds something other than a string.
    #[error("constructor tag must be a string")]
    InvalidConstructor,
    /// An untagged container nested inside a graph-encoded payload.
    #[error("untagged container inside a graph-encoded value")]
    UntaggedContainer,
    /// A handler found its payload fields in the wrong shape.
    #[error("invalid {tag} payload: {reason}")]
    Payload { tag: String, reason: String },
}

/// Errors raised while rebuilding a live value from its plain form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The tag is neither allow-listed nor claimed by a handler.
    #[error("the type {0} is not allowed")]
    DisallowedType(String),
    #[error("malformed input: {0}")]
    Malformed(#[from] MalformedInput),
    /// Nesting exceeded `CodecOptions::max_depth`.
    #[error("maximum nesting depth of {0} exceeded")]
    DepthExceeded(usize),
    /// A registered handler failed for a reason other than payload shape.
    #[error("handler for {tag} failed: {message}")]
    Handler { tag: String, message: String },
}

impl DecodeError {
    /// Shorthand for a handler payload-shape failure.
    pub fn payload(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        DecodeError::Malformed(MalformedInput::Payload {
            tag: tag.into(),
            reason: reason.into(),
        })
    }
}

impl EncodeError {
    pub fn handler(tag: impl Into<String>, message: impl Into<String>) -> Self {
        EncodeError::Handler {
            tag: tag.into(),
            message: message.into(),
        }
    }
}
