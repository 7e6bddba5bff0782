//! In-memory transport implementation for testing

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{HeaderMap, Method, Response, StatusCode, Transport, TransportError};

#[derive(Clone, Debug)]
enum Route {
    Respond { status: StatusCode, body: Bytes },
    Fail(TransportError),
    Pending,
}

/// A request observed by a [`MemoryTransport`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Request method
    pub method: Method,
    /// Request path, below the API prefix
    pub path: String,
    /// JSON payload, if any
    pub payload: Option<Vec<u8>>,
}

impl RecordedRequest {
    /// The payload parsed as JSON
    pub fn json(&self) -> Option<serde_json::Value> {
        self.payload
            .as_deref()
            .and_then(|payload| serde_json::from_slice(payload).ok())
    }
}

/// In-memory transport with scripted responses.
///
/// Responses are keyed by `(method, path)`. Requests to unscripted routes are
/// answered with `404 Not Found`. Clones share the same routes and request
/// log.
///
/// # Examples
///
/// ```
/// use storagrid_remote::transport::{MemoryTransport, Method, StatusCode, Transport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = MemoryTransport::new();
/// transport
///     .respond(
///         Method::GET,
///         "/org/containers/logs/region",
///         StatusCode::OK,
///         r#"{"data":{"region":"us-east-1"}}"#,
///     )
///     .await;
///
/// let response = transport
///     .send(Method::GET, "/org/containers/logs/region", None, StatusCode::OK)
///     .await?;
/// assert_eq!(response.status, StatusCode::OK);
/// assert_eq!(transport.requests().await.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryTransport {
    routes: Arc<RwLock<HashMap<(Method, String), Route>>>,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

impl MemoryTransport {
    /// Create a new transport with no scripted routes
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests to `path` with `status` and `body`
    pub async fn respond(
        &self,
        method: Method,
        path: impl Into<String>,
        status: StatusCode,
        body: impl Into<Bytes>,
    ) {
        self.route(
            method,
            path,
            Route::Respond {
                status,
                body: body.into(),
            },
        )
        .await;
    }

    /// Fail requests to `path` with `error`
    pub async fn fail(&self, method: Method, path: impl Into<String>, error: TransportError) {
        self.route(method, path, Route::Fail(error)).await;
    }

    /// Never answer requests to `path`
    pub async fn hang(&self, method: Method, path: impl Into<String>) {
        self.route(method, path, Route::Pending).await;
    }

    /// Every request sent so far, in arrival order
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    async fn route(&self, method: Method, path: impl Into<String>, route: Route) {
        let mut routes = self.routes.write().await;
        routes.insert((method, path.into()), route);
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<Vec<u8>>,
        expected: StatusCode,
    ) -> Result<Response, TransportError> {
        self.requests.write().await.push(RecordedRequest {
            method: method.clone(),
            path: path.to_string(),
            payload,
        });

        let route = {
            let routes = self.routes.read().await;
            routes.get(&(method, path.to_string())).cloned()
        };

        let (status, body) = match route {
            Some(Route::Respond { status, body }) => (status, body),
            Some(Route::Fail(error)) => return Err(error),
            Some(Route::Pending) => std::future::pending().await,
            None => (StatusCode::NOT_FOUND, Bytes::new()),
        };

        if status != expected {
            return Err(TransportError::UnexpectedStatus {
                status,
                expected,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(Response {
            body,
            headers: HeaderMap::new(),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn it_answers_scripted_routes() -> testresult::TestResult {
        let transport = MemoryTransport::new();
        transport
            .respond(Method::GET, "/org/containers/a/region", StatusCode::OK, "{}")
            .await;

        let response = transport
            .send(Method::GET, "/org/containers/a/region", None, StatusCode::OK)
            .await?;
        assert_eq!(response.body, Bytes::from_static(b"{}"));
        Ok(())
    }

    #[tokio::test]
    async fn it_reports_unscripted_routes_as_not_found() {
        let transport = MemoryTransport::new();

        let result = transport
            .send(Method::GET, "/org/containers/a/region", None, StatusCode::OK)
            .await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn it_reports_status_mismatches() {
        let transport = MemoryTransport::new();
        transport
            .respond(Method::POST, "/org/containers", StatusCode::OK, "{}")
            .await;

        let result = transport
            .send(Method::POST, "/org/containers", None, StatusCode::CREATED)
            .await;
        assert_eq!(result.unwrap_err().status(), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn it_records_requests_across_clones() {
        let transport = MemoryTransport::new();
        let clone = transport.clone();
        clone
            .fail(
                Method::PUT,
                "/org/containers/a/policy",
                TransportError::Connection("refused".into()),
            )
            .await;

        let result = clone
            .send(
                Method::PUT,
                "/org/containers/a/policy",
                Some(b"{\"policy\":null}".to_vec()),
                StatusCode::OK,
            )
            .await;
        assert!(matches!(result, Err(TransportError::Connection(_))));

        let requests = transport.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::PUT);
        assert_eq!(
            requests[0].json(),
            Some(serde_json::json!({"policy": null}))
        );
    }

    #[tokio::test]
    async fn it_can_hold_a_route_pending() {
        let transport = MemoryTransport::new();
        transport.hang(Method::GET, "/org/containers/a/region").await;

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            transport.send(Method::GET, "/org/containers/a/region", None, StatusCode::OK),
        )
        .await;
        assert!(result.is_err());
    }
}
