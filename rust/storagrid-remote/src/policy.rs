use std::sync::Arc;

use storagrid_policy::{PolicyDocument, PolicyError, decode_response, encode, encode_removal};

use crate::transport::{Method, StatusCode};
use crate::{ContainerName, POLICY_ATTRIBUTE, RemoteError, Transport, TransportError};

/// Reads and writes the access policy attached to a container
pub struct PolicyClient<T> {
    transport: Arc<T>,
}

impl<T> Clone for PolicyClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T> PolicyClient<T>
where
    T: Transport,
{
    /// Create a client that sends its requests through `transport`
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Create a client sharing a transport with other clients
    pub fn from_shared(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Attach `document` to the container, replacing any existing policy,
    /// and return the document as stored by the API
    #[tracing::instrument(skip_all, fields(container = %name))]
    pub async fn put(
        &self,
        name: &ContainerName,
        document: &PolicyDocument,
    ) -> Result<PolicyDocument, RemoteError> {
        name.validate()?;
        let payload = encode(document).map_err(|source| policy_error(name, source))?;

        tracing::debug!(statements = document.statements.len(), "Writing policy");
        let response = self
            .transport
            .send(
                Method::PUT,
                &name.attribute_path(POLICY_ATTRIBUTE),
                Some(payload),
                StatusCode::OK,
            )
            .await
            .map_err(|error| rejected_or_transport(name, "write policy", error))?;

        decode_response(&response.body)
            .and_then(|document| document.ok_or(PolicyError::Absent))
            .map_err(|source| policy_error(name, source))
    }

    /// Read the container's policy; `None` when the container has none
    #[tracing::instrument(skip_all, fields(container = %name))]
    pub async fn get(&self, name: &ContainerName) -> Result<Option<PolicyDocument>, RemoteError> {
        name.validate()?;
        tracing::debug!("Reading policy");
        let response = self
            .transport
            .send(
                Method::GET,
                &name.attribute_path(POLICY_ATTRIBUTE),
                None,
                StatusCode::OK,
            )
            .await
            .map_err(|error| RemoteError::from_transport(name, "read policy", error))?;

        decode_response(&response.body).map_err(|source| policy_error(name, source))
    }

    /// Remove the container's policy
    #[tracing::instrument(skip_all, fields(container = %name))]
    pub async fn delete(&self, name: &ContainerName) -> Result<(), RemoteError> {
        name.validate()?;
        tracing::debug!("Removing policy");
        self.transport
            .send(
                Method::PUT,
                &name.attribute_path(POLICY_ATTRIBUTE),
                Some(encode_removal()),
                StatusCode::OK,
            )
            .await
            .map_err(|error| RemoteError::from_transport(name, "remove policy", error))?;
        Ok(())
    }
}

fn policy_error(name: &ContainerName, source: PolicyError) -> RemoteError {
    RemoteError::Policy {
        container: name.clone(),
        source,
    }
}

fn rejected_or_transport(
    name: &ContainerName,
    operation: &'static str,
    error: TransportError,
) -> RemoteError {
    match error {
        TransportError::UnexpectedStatus { status, body, .. }
            if status == StatusCode::BAD_REQUEST =>
        {
            tracing::warn!(container = %name, "Policy rejected");
            RemoteError::InvalidPolicy {
                container: name.clone(),
                reason: body,
            }
        }
        other => RemoteError::from_transport(name, operation, other),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use storagrid_policy::{Principal, Statement};

    use super::*;
    use crate::{ErrorKind, MemoryTransport};

    fn logs() -> ContainerName {
        ContainerName::new("logs")
    }

    fn document() -> PolicyDocument {
        PolicyDocument::new("read-only", "2012-10-17").with_statement(
            Statement::allow()
                .sid("public-read")
                .action("s3:GetObject")
                .resource("arn:aws:s3:::logs/*")
                .principal(Principal::Wildcard)
                .build(),
        )
    }

    #[tokio::test]
    async fn it_puts_a_policy_and_decodes_the_stored_copy() -> testresult::TestResult {
        let transport = MemoryTransport::new();
        transport
            .respond(
                Method::PUT,
                logs().attribute_path(POLICY_ATTRIBUTE),
                StatusCode::OK,
                json!({
                    "data": {
                        "policy": {
                            "Id": "read-only",
                            "Version": "2012-10-17",
                            "Statement": [{
                                "Sid": "public-read",
                                "Effect": "Allow",
                                "Action": "s3:GetObject",
                                "Resource": "arn:aws:s3:::logs/*",
                                "Principal": "*"
                            }]
                        }
                    }
                })
                .to_string(),
            )
            .await;

        let client = PolicyClient::new(transport.clone());
        let stored = client.put(&logs(), &document()).await?;
        assert_eq!(stored, document());

        let sent = transport.requests().await[0].json();
        assert_eq!(
            sent,
            Some(json!({
                "policy": {
                    "Id": "read-only",
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Sid": "public-read",
                        "Effect": "Allow",
                        "Action": ["s3:GetObject"],
                        "Resource": ["arn:aws:s3:::logs/*"],
                        "Principal": "*"
                    }]
                }
            }))
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_reports_a_rejected_policy() {
        let transport = MemoryTransport::new();
        transport
            .respond(
                Method::PUT,
                logs().attribute_path(POLICY_ATTRIBUTE),
                StatusCode::BAD_REQUEST,
                "Invalid principal",
            )
            .await;

        let client = PolicyClient::new(transport);
        let error = client.put(&logs(), &document()).await.unwrap_err();

        match &error {
            RemoteError::InvalidPolicy { reason, .. } => assert_eq!(reason, "Invalid principal"),
            other => panic!("Expected an invalid policy error, got {:?}", other),
        }
        assert_eq!(error.kind(), ErrorKind::Rejected);
    }

    #[tokio::test]
    async fn it_reports_a_missing_container() {
        let client = PolicyClient::new(MemoryTransport::new());

        assert!(client.put(&logs(), &document()).await.unwrap_err().is_not_found());
        assert!(client.get(&logs()).await.unwrap_err().is_not_found());
        assert!(client.delete(&logs()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn it_reads_an_absent_policy_as_none() -> testresult::TestResult {
        let transport = MemoryTransport::new();
        transport
            .respond(
                Method::GET,
                logs().attribute_path(POLICY_ATTRIBUTE),
                StatusCode::OK,
                r#"{"data":{"policy":null}}"#,
            )
            .await;

        let client = PolicyClient::new(transport);
        assert_eq!(client.get(&logs()).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn it_surfaces_structural_errors_with_context() {
        let transport = MemoryTransport::new();
        transport
            .respond(
                Method::GET,
                logs().attribute_path(POLICY_ATTRIBUTE),
                StatusCode::OK,
                r#"{"data":{"policy":{"Statement":[{"Effect":"Allow","Action":{"s3":1}}]}}}"#,
            )
            .await;

        let client = PolicyClient::new(transport);
        let error = client.get(&logs()).await.unwrap_err();

        match error {
            RemoteError::Policy { source, .. } => assert_eq!(source.field(), Some("Action")),
            other => panic!("Expected a policy error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn it_removes_a_policy_with_a_null_document() -> testresult::TestResult {
        let transport = MemoryTransport::new();
        transport
            .respond(
                Method::PUT,
                logs().attribute_path(POLICY_ATTRIBUTE),
                StatusCode::OK,
                r#"{"data":{"policy":null}}"#,
            )
            .await;

        let client = PolicyClient::new(transport.clone());
        client.delete(&logs()).await?;

        let requests = transport.requests().await;
        assert_eq!(requests[0].method, Method::PUT);
        assert_eq!(requests[0].json(), Some(json!({"policy": null})));
        Ok(())
    }
}
