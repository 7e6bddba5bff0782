//! Request/response plumbing towards the storage-management API
//!
//! Every call names a method, a path below the API prefix, an optional JSON
//! payload and the status code the caller expects. Any other status is
//! reported as [`TransportError::UnexpectedStatus`] carrying the actual code,
//! so callers can tell a missing container apart from a generic failure.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use reqwest::header::HeaderMap;
pub use reqwest::{Method, StatusCode};

mod memory;
pub use memory::*;

mod rest;
pub use rest::*;

/// A response whose status matched the expected one
#[derive(Debug, Clone)]
pub struct Response {
    /// Raw response body
    pub body: Bytes,
    /// Response headers
    pub headers: HeaderMap,
    /// Status code returned by the API
    pub status: StatusCode,
}

/// Errors that can occur while talking to the storage-management API
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The API could not be reached
    #[error("Failed to connect to storage-management API: {0}")]
    Connection(String),

    /// The request could not be sent or its response could not be read
    #[error("Request to storage-management API failed: {0}")]
    Request(String),

    /// The API answered with a status other than the expected one
    #[error("Unexpected status code {status} (expected {expected}): {body}")]
    UnexpectedStatus {
        /// Status the API answered with
        status: StatusCode,
        /// Status the caller expected
        expected: StatusCode,
        /// Response body, for diagnostics
        body: String,
    },

    /// The transport was configured with unusable settings
    #[error("Invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// The status code the API answered with, when it answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API reported that the addressed entity does not exist
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            TransportError::Connection(error.to_string())
        } else {
            TransportError::Request(error.to_string())
        }
    }
}

/// Sends requests to the storage-management API.
///
/// Retries, if any, belong to implementations of this trait; callers never
/// retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `payload` (a JSON document, if any) to `path` with `method` and
    /// return the response if its status equals `expected`
    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<Vec<u8>>,
        expected: StatusCode,
    ) -> Result<Response, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_recognizes_not_found() {
        let error = TransportError::UnexpectedStatus {
            status: StatusCode::NOT_FOUND,
            expected: StatusCode::OK,
            body: String::new(),
        };
        assert!(error.is_not_found());
        assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));

        let error = TransportError::Connection("refused".into());
        assert!(!error.is_not_found());
        assert_eq!(error.status(), None);
    }
}
