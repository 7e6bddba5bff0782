use std::fmt::{Display, Formatter};

use storagrid_policy::PolicyError;
use thiserror::Error;

use crate::{ContainerName, TransportError};

/// The kind of a [`RemoteError`], for identity checks that do not depend on
/// the error's message or its position inside an [`AggregateError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The container (or one of its sub-resources) does not exist upstream
    NotFound,
    /// The API could not be reached or answered unexpectedly
    Transport,
    /// A request or response body did not have the expected shape
    Decode,
    /// A policy document could not be encoded or decoded
    Policy,
    /// The API or the client refused the requested change
    Rejected,
    /// The operation was cancelled by the caller
    Cancelled,
    /// A concurrent sub-fetch panicked or was aborted
    TaskFailed,
    /// Several failures reported together
    Aggregate,
}

/// Errors that can occur when reading or changing a container
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The container does not exist
    #[error("Container {container} not found")]
    NotFound {
        /// Name of the missing container
        container: ContainerName,
    },

    /// The transport failed for a reason other than a missing container
    #[error("Failed to {operation} for container {container}: {source}")]
    Transport {
        /// Name of the container addressed
        container: ContainerName,
        /// What was being attempted
        operation: &'static str,
        /// Underlying transport failure
        #[source]
        source: TransportError,
    },

    /// A response body could not be decoded
    #[error("Failed to decode {attribute} of container {container}: {reason}")]
    Decode {
        /// Name of the container addressed
        container: ContainerName,
        /// Which sub-resource was being decoded
        attribute: &'static str,
        /// What was wrong with the body
        reason: String,
    },

    /// A request body could not be serialized
    #[error("Failed to encode request for container {container}: {reason}")]
    Encode {
        /// Name of the container addressed
        container: ContainerName,
        /// Why serialization failed
        reason: String,
    },

    /// The container's policy document could not be encoded or decoded
    #[error("Policy document of container {container} is invalid: {source}")]
    Policy {
        /// Name of the container addressed
        container: ContainerName,
        /// Underlying codec failure
        #[source]
        source: PolicyError,
    },

    /// The API rejected a policy document
    #[error("Policy document for container {container} was rejected: {reason}")]
    InvalidPolicy {
        /// Name of the container addressed
        container: ContainerName,
        /// Response body explaining the rejection
        reason: String,
    },

    /// The container name cannot be used to address a container
    #[error("Container name {container:?} cannot be used: {reason}")]
    InvalidName {
        /// Name of the container addressed
        container: ContainerName,
        /// What is wrong with the name
        reason: &'static str,
    },

    /// Object lock can only be chosen when a container is created
    #[error("Object lock of container {container} cannot be enabled or disabled after creation")]
    ObjectLockImmutable {
        /// Name of the container addressed
        container: ContainerName,
    },

    /// A sub-fetch observed cancellation before completing
    #[error("Reading {attribute} of container {container} was cancelled")]
    Cancelled {
        /// Name of the container addressed
        container: ContainerName,
        /// Which sub-resource was being fetched
        attribute: &'static str,
    },

    /// A sub-fetch task panicked or was aborted
    #[error("Reading {attribute} of container {container} did not complete: {reason}")]
    TaskFailed {
        /// Name of the container addressed
        container: ContainerName,
        /// Which sub-resource was being fetched
        attribute: &'static str,
        /// Why the task did not complete
        reason: String,
    },

    /// Several concurrent sub-fetches failed
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl RemoteError {
    /// Classify a transport failure, keeping a 404 distinguishable from other
    /// failures
    pub(crate) fn from_transport(
        container: &ContainerName,
        operation: &'static str,
        error: TransportError,
    ) -> Self {
        if error.is_not_found() {
            tracing::debug!(%container, operation, "Container not found");
            RemoteError::NotFound {
                container: container.clone(),
            }
        } else {
            RemoteError::Transport {
                container: container.clone(),
                operation,
                source: error,
            }
        }
    }

    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RemoteError::NotFound { .. } => ErrorKind::NotFound,
            RemoteError::Transport { .. } => ErrorKind::Transport,
            RemoteError::Decode { .. } | RemoteError::Encode { .. } => ErrorKind::Decode,
            RemoteError::Policy { .. } => ErrorKind::Policy,
            RemoteError::InvalidPolicy { .. }
            | RemoteError::InvalidName { .. }
            | RemoteError::ObjectLockImmutable { .. } => ErrorKind::Rejected,
            RemoteError::Cancelled { .. } => ErrorKind::Cancelled,
            RemoteError::TaskFailed { .. } => ErrorKind::TaskFailed,
            RemoteError::Aggregate(_) => ErrorKind::Aggregate,
        }
    }

    /// Whether this error is, or (for an aggregate) includes, an error of
    /// `kind`
    pub fn contains(&self, kind: ErrorKind) -> bool {
        match self {
            RemoteError::Aggregate(aggregate) => {
                kind == ErrorKind::Aggregate || aggregate.contains(kind)
            }
            other => other.kind() == kind,
        }
    }

    /// Whether the container was reported missing
    pub fn is_not_found(&self) -> bool {
        self.contains(ErrorKind::NotFound)
    }
}

/// Every failure observed while reading a container concurrently.
///
/// Constituents are kept in the order their sub-fetches were launched.
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<RemoteError>,
}

impl AggregateError {
    pub(crate) fn new(errors: Vec<RemoteError>) -> Self {
        Self { errors }
    }

    /// The constituent errors
    pub fn errors(&self) -> &[RemoteError] {
        &self.errors
    }

    /// Iterate over the constituent errors
    pub fn iter(&self) -> std::slice::Iter<'_, RemoteError> {
        self.errors.iter()
    }

    /// Number of constituent errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether there are no constituent errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any constituent error is of `kind`
    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|error| error.contains(kind))
    }

    /// Whether any constituent reported the container missing
    pub fn is_not_found(&self) -> bool {
        self.contains(ErrorKind::NotFound)
    }

    /// Take the constituent errors
    pub fn into_errors(self) -> Vec<RemoteError> {
        self.errors
    }
}

impl Display for AggregateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors
            .first()
            .map(|error| error as &(dyn std::error::Error + 'static))
    }
}

impl<'a> IntoIterator for &'a AggregateError {
    type Item = &'a RemoteError;
    type IntoIter = std::slice::Iter<'a, RemoteError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
