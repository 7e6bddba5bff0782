use thiserror::Error;

use crate::value::ShapeError;

/// Errors that can occur when translating a policy document to or from its
/// wire encoding
#[derive(Error, Debug)]
pub enum PolicyError {
    /// The payload is not JSON, or its envelope does not have the expected
    /// shape
    #[error("Malformed policy payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A statement field carries a value that matches none of the recognized
    /// shapes
    #[error("Invalid \"{field}\" in statement #{statement}: {shape}")]
    Structural {
        /// Position of the offending statement within the document
        statement: usize,
        /// Wire name of the offending field
        field: &'static str,
        /// What was expected and what was found instead
        shape: ShapeError,
    },

    /// The envelope carried no policy document where one was required
    #[error("Payload carries no policy document")]
    Absent,

    /// Serializing the document failed
    #[error("Failed to encode policy document: {0}")]
    Encode(#[source] serde_json::Error),
}

impl PolicyError {
    /// The wire field that failed to decode, if the failure was structural
    pub fn field(&self) -> Option<&'static str> {
        match self {
            PolicyError::Structural { field, .. } => Some(field),
            _ => None,
        }
    }
}
