use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

use crate::transport::{Method, StatusCode};
use crate::{
    AggregateError, ContainerName, ContainerSnapshot, OBJECT_LOCK_ATTRIBUTE, ObjectLockConfig,
    REGION_ATTRIBUTE, RemoteError, Transport, decode_object_lock, decode_region,
};

/// Assembles a [`ContainerSnapshot`] from a container's region and
/// object-lock sub-resources.
///
/// Each [`ContainerReader::read`] spawns one task per sub-resource and waits
/// for all of them; when any fails, every failure is reported together in an
/// [`AggregateError`].
///
/// # Examples
///
/// ```
/// use storagrid_remote::transport::{Method, StatusCode};
/// use storagrid_remote::{ContainerName, ContainerReader, MemoryTransport};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = MemoryTransport::new();
/// transport
///     .respond(
///         Method::GET,
///         "/org/containers/logs/region",
///         StatusCode::OK,
///         r#"{"data":{"region":"us-east-1"}}"#,
///     )
///     .await;
/// transport
///     .respond(
///         Method::GET,
///         "/org/containers/logs/object-lock",
///         StatusCode::OK,
///         r#"{"data":{"enabled":false}}"#,
///     )
///     .await;
///
/// let reader = ContainerReader::new(transport);
/// let snapshot = reader.read(&ContainerName::new("logs")).await?;
/// assert_eq!(snapshot.region, "us-east-1");
/// assert_eq!(snapshot.object_lock, None);
/// # Ok(())
/// # }
/// ```
pub struct ContainerReader<T> {
    transport: Arc<T>,
}

impl<T> Clone for ContainerReader<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T> ContainerReader<T>
where
    T: Transport + 'static,
{
    /// Create a reader that sends its requests through `transport`
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Create a reader sharing a transport with other clients
    pub fn from_shared(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// The transport this reader sends its requests through
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Read only the container's region
    pub async fn region(&self, name: &ContainerName) -> Result<String, RemoteError> {
        fetch_region(self.transport.as_ref(), name).await
    }

    /// Read only the container's object-lock configuration
    pub async fn object_lock(
        &self,
        name: &ContainerName,
    ) -> Result<Option<ObjectLockConfig>, RemoteError> {
        fetch_object_lock(self.transport.as_ref(), name).await
    }

    /// Read the container's full state
    pub async fn read(&self, name: &ContainerName) -> Result<ContainerSnapshot, RemoteError> {
        self.read_with(name, &CancellationToken::new()).await
    }

    /// Read the container's full state, giving up on every sub-resource that
    /// has not been fetched once `cancel` fires
    #[tracing::instrument(skip_all, fields(container = %name))]
    pub async fn read_with(
        &self,
        name: &ContainerName,
        cancel: &CancellationToken,
    ) -> Result<ContainerSnapshot, RemoteError> {
        let region = {
            let transport = Arc::clone(&self.transport);
            let name = name.clone();
            spawn_fetch(name.clone(), REGION_ATTRIBUTE, cancel.clone(), async move {
                fetch_region(transport.as_ref(), &name).await
            })
        };

        let object_lock = {
            let transport = Arc::clone(&self.transport);
            let name = name.clone();
            spawn_fetch(
                name.clone(),
                OBJECT_LOCK_ATTRIBUTE,
                cancel.clone(),
                async move { fetch_object_lock(transport.as_ref(), &name).await },
            )
        };

        let (region, object_lock) = tokio::join!(region, object_lock);
        let region =
            region.unwrap_or_else(|error| Err(task_failed(name, REGION_ATTRIBUTE, error)));
        let object_lock = object_lock
            .unwrap_or_else(|error| Err(task_failed(name, OBJECT_LOCK_ATTRIBUTE, error)));

        match (region, object_lock) {
            (Ok(region), Ok(object_lock)) => Ok(ContainerSnapshot {
                name: name.clone(),
                region,
                object_lock,
            }),
            (region, object_lock) => {
                let errors: Vec<RemoteError> = [region.err(), object_lock.err()]
                    .into_iter()
                    .flatten()
                    .collect();

                let aggregate = AggregateError::new(errors);
                tracing::warn!(
                    failures = aggregate.len(),
                    not_found = aggregate.is_not_found(),
                    "Reading container failed"
                );
                Err(aggregate.into())
            }
        }
    }
}

fn spawn_fetch<F, R>(
    container: ContainerName,
    attribute: &'static str,
    cancel: CancellationToken,
    fetch: F,
) -> AbortOnDropHandle<Result<R, RemoteError>>
where
    F: Future<Output = Result<R, RemoteError>> + Send + 'static,
    R: Send + 'static,
{
    AbortOnDropHandle::new(tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(%container, attribute, "Read cancelled");
                Err(RemoteError::Cancelled { container, attribute })
            }
            result = fetch => result,
        }
    }))
}

fn task_failed(
    container: &ContainerName,
    attribute: &'static str,
    error: JoinError,
) -> RemoteError {
    RemoteError::TaskFailed {
        container: container.clone(),
        attribute,
        reason: error.to_string(),
    }
}

async fn fetch_region<T>(transport: &T, name: &ContainerName) -> Result<String, RemoteError>
where
    T: Transport + ?Sized,
{
    name.validate()?;
    tracing::debug!(container = %name, attribute = REGION_ATTRIBUTE, "Reading container attribute");
    let response = transport
        .send(
            Method::GET,
            &name.attribute_path(REGION_ATTRIBUTE),
            None,
            StatusCode::OK,
        )
        .await
        .map_err(|error| RemoteError::from_transport(name, "read region", error))?;

    tracing::trace!(
        container = %name,
        attribute = REGION_ATTRIBUTE,
        "Decoding container attribute"
    );
    decode_region(name, &response.body)
}

async fn fetch_object_lock<T>(
    transport: &T,
    name: &ContainerName,
) -> Result<Option<ObjectLockConfig>, RemoteError>
where
    T: Transport + ?Sized,
{
    name.validate()?;
    tracing::debug!(
        container = %name,
        attribute = OBJECT_LOCK_ATTRIBUTE,
        "Reading container attribute"
    );
    let response = transport
        .send(
            Method::GET,
            &name.attribute_path(OBJECT_LOCK_ATTRIBUTE),
            None,
            StatusCode::OK,
        )
        .await
        .map_err(|error| RemoteError::from_transport(name, "read object lock", error))?;

    tracing::trace!(
        container = %name,
        attribute = OBJECT_LOCK_ATTRIBUTE,
        "Decoding container attribute"
    );
    decode_object_lock(name, &response.body)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::transport::{HeaderMap, Response};
    use crate::{ErrorKind, MemoryTransport, RetentionMode, RetentionPeriod, TransportError};

    /// Serves the region but panics while the object lock is being fetched
    struct FailingObjectLock;

    #[async_trait::async_trait]
    impl Transport for FailingObjectLock {
        async fn send(
            &self,
            _method: Method,
            path: &str,
            _payload: Option<Vec<u8>>,
            _expected: StatusCode,
        ) -> Result<Response, TransportError> {
            if path.ends_with(OBJECT_LOCK_ATTRIBUTE) {
                panic!("connection pool poisoned");
            }
            Ok(Response {
                body: r#"{"data":{"region":"eu-west-1"}}"#.into(),
                headers: HeaderMap::new(),
                status: StatusCode::OK,
            })
        }
    }

    async fn respond(transport: &MemoryTransport, attribute: &str, body: &'static str) {
        transport
            .respond(
                Method::GET,
                ContainerName::new("logs").attribute_path(attribute),
                StatusCode::OK,
                body,
            )
            .await;
    }

    #[tokio::test]
    async fn it_reads_each_attribute_on_its_own() -> testresult::TestResult {
        let transport = MemoryTransport::new();
        respond(&transport, REGION_ATTRIBUTE, r#"{"data":{"region":"eu-west-1"}}"#).await;
        respond(
            &transport,
            OBJECT_LOCK_ATTRIBUTE,
            r#"{"data":{"enabled":true,"defaultRetentionSetting":{"mode":"compliance","years":"3"}}}"#,
        )
        .await;

        let reader = ContainerReader::new(transport);
        let name = ContainerName::new("logs");

        assert_eq!(reader.region(&name).await?, "eu-west-1");
        assert_eq!(
            reader.object_lock(&name).await?,
            Some(ObjectLockConfig::new(
                RetentionMode::Compliance,
                RetentionPeriod::Years(3)
            ))
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_sends_one_request_per_attribute() -> testresult::TestResult {
        let transport = MemoryTransport::new();
        respond(&transport, REGION_ATTRIBUTE, r#"{"data":{"region":"eu-west-1"}}"#).await;
        respond(&transport, OBJECT_LOCK_ATTRIBUTE, r#"{"data":{"enabled":false}}"#).await;

        let reader = ContainerReader::new(transport.clone());
        reader.read(&ContainerName::new("logs")).await?;

        let mut paths: Vec<String> = transport
            .requests()
            .await
            .into_iter()
            .map(|request| request.path)
            .collect();
        paths.sort();
        assert_eq!(
            paths,
            [
                "/org/containers/logs/object-lock",
                "/org/containers/logs/region"
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_wraps_a_single_failure_in_an_aggregate() {
        let transport = MemoryTransport::new();
        respond(&transport, REGION_ATTRIBUTE, r#"{"data":{"region":"eu-west-1"}}"#).await;
        respond(&transport, OBJECT_LOCK_ATTRIBUTE, r#"{"data":{"enabled":"yes"}}"#).await;

        let reader = ContainerReader::new(transport);
        let error = reader
            .read(&ContainerName::new("logs"))
            .await
            .unwrap_err();

        match &error {
            RemoteError::Aggregate(aggregate) => {
                assert_eq!(aggregate.len(), 1);
                assert_eq!(aggregate.errors()[0].kind(), ErrorKind::Decode);
            }
            other => panic!("Expected an aggregate error, got {:?}", other),
        }
        assert!(!error.is_not_found());
    }

    #[tokio::test]
    async fn it_reports_a_panicked_fetch_as_a_failed_task() {
        let reader = ContainerReader::new(FailingObjectLock);
        let error = reader
            .read(&ContainerName::new("logs"))
            .await
            .unwrap_err();

        assert!(error.contains(ErrorKind::TaskFailed));
        assert!(!error.is_not_found());

        let RemoteError::Aggregate(aggregate) = &error else {
            panic!("Expected an aggregate error, got {:?}", error);
        };
        assert_eq!(aggregate.len(), 1);
        match &aggregate.errors()[0] {
            RemoteError::TaskFailed {
                container,
                attribute,
                reason,
            } => {
                assert_eq!(container.as_str(), "logs");
                assert_eq!(*attribute, OBJECT_LOCK_ATTRIBUTE);
                assert!(reason.contains("panic"), "unexpected reason: {reason}");
            }
            other => panic!("Expected a failed task, got {:?}", other),
        }
    }
}
