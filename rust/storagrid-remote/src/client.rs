use std::sync::Arc;

use serde::Serialize;

use crate::container::{ObjectLockPayload, decode_created};
use crate::transport::{Method, StatusCode};
use crate::{
    CONTAINERS_PATH, ContainerName, ContainerReader, ContainerSnapshot, CreateContainer,
    OBJECT_LOCK_ATTRIBUTE, ObjectLockConfig, RemoteError, Transport,
};

pub(crate) fn encode_payload<S: Serialize>(
    container: &ContainerName,
    payload: &S,
) -> Result<Vec<u8>, RemoteError> {
    serde_json::to_vec(payload).map_err(|error| RemoteError::Encode {
        container: container.clone(),
        reason: error.to_string(),
    })
}

/// Creates, reads, updates and deletes containers
pub struct ContainerClient<T> {
    reader: ContainerReader<T>,
}

impl<T> Clone for ContainerClient<T> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
        }
    }
}

impl<T> ContainerClient<T>
where
    T: Transport + 'static,
{
    /// Create a client that sends its requests through `transport`
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Create a client sharing a transport with other clients
    pub fn from_shared(transport: Arc<T>) -> Self {
        Self {
            reader: ContainerReader::from_shared(transport),
        }
    }

    /// The reader used to assemble container snapshots
    pub fn reader(&self) -> &ContainerReader<T> {
        &self.reader
    }

    /// Create a container, then read it back so that a region chosen by the
    /// API is reflected in the returned snapshot
    #[tracing::instrument(skip_all, fields(container = %request.name))]
    pub async fn create(
        &self,
        request: &CreateContainer,
    ) -> Result<ContainerSnapshot, RemoteError> {
        request.name.validate()?;
        let payload = encode_payload(&request.name, &request.payload())?;

        tracing::debug!("Creating container");
        let response = self
            .reader
            .transport()
            .send(
                Method::POST,
                CONTAINERS_PATH,
                Some(payload),
                StatusCode::CREATED,
            )
            .await
            .map_err(|error| {
                RemoteError::from_transport(&request.name, "create container", error)
            })?;

        let created = decode_created(&request.name, &response.body)?;
        self.reader.read(&created).await
    }

    /// Read a container's full state
    pub async fn read(&self, name: &ContainerName) -> Result<ContainerSnapshot, RemoteError> {
        self.reader.read(name).await
    }

    /// Change the default retention of a container that has object lock.
    ///
    /// Object lock itself can only be chosen when the container is created;
    /// asking to enable or disable it fails with
    /// [`RemoteError::ObjectLockImmutable`]. Returns the configuration as read
    /// back from the API.
    #[tracing::instrument(skip_all, fields(container = %name))]
    pub async fn update_object_lock(
        &self,
        name: &ContainerName,
        current: Option<ObjectLockConfig>,
        desired: Option<ObjectLockConfig>,
    ) -> Result<Option<ObjectLockConfig>, RemoteError> {
        name.validate()?;
        let desired = match (current, desired) {
            (None, None) => return Ok(current),
            (Some(_), Some(desired)) => desired,
            _ => {
                return Err(RemoteError::ObjectLockImmutable {
                    container: name.clone(),
                });
            }
        };

        let payload = encode_payload(name, &ObjectLockPayload::from(desired))?;

        tracing::debug!(mode = %desired.mode, "Updating object lock");
        self.reader
            .transport()
            .send(
                Method::PUT,
                &name.attribute_path(OBJECT_LOCK_ATTRIBUTE),
                Some(payload),
                StatusCode::OK,
            )
            .await
            .map_err(|error| RemoteError::from_transport(name, "update object lock", error))?;

        self.reader.object_lock(name).await
    }

    /// Delete a container
    #[tracing::instrument(skip_all, fields(container = %name))]
    pub async fn delete(&self, name: &ContainerName) -> Result<(), RemoteError> {
        name.validate()?;
        tracing::debug!("Deleting container");
        self.reader
            .transport()
            .send(Method::DELETE, &name.path(), None, StatusCode::NO_CONTENT)
            .await
            .map_err(|error| RemoteError::from_transport(name, "delete container", error))?;
        Ok(())
    }
}
