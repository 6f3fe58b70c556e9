use json_graph_core::{DecodeError, EncodeError};
use thiserror::Error;

/// Failure of a text-level [`serialize`](crate::serialize) or
/// [`deserialize`](crate::deserialize) call.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The rejected tag, when decoding failed on a disallowed type.
    pub fn disallowed_type(&self) -> Option<&str> {
        match self {
            Error::Decode(DecodeError::DisallowedType(tag)) => Some(tag),
            _ => None,
        }
    }
}
