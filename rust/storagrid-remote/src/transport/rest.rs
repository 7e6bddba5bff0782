//! REST transport implementation for the storage-management API

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use super::{Method, Response, StatusCode, Transport, TransportError};

/// Environment variable holding the API address
pub const ADDRESS_VARIABLE: &str = "STORAGEGRID_ADDRESS";
/// Environment variable holding a pre-obtained bearer token
pub const TOKEN_VARIABLE: &str = "STORAGEGRID_TOKEN";
/// Environment variable that disables TLS certificate verification
pub const INSECURE_VARIABLE: &str = "STORAGEGRID_INSECURE";

/// Path prefix of the tenant API
pub const DEFAULT_API_PREFIX: &str = "/api/v4";

/// Authentication methods for the REST transport
#[derive(Clone, Debug)]
pub enum AuthMethod {
    /// No authentication
    None,

    /// Bearer token authentication
    ///
    /// Includes `Authorization: Bearer {token}` header in all requests
    Bearer(String),
}

/// Configuration for the REST transport
#[derive(Clone, Debug)]
pub struct RestTransportConfig {
    /// Base URL of the API (e.g., "https://grid.example.com:9443")
    pub endpoint: String,

    /// Path prefix placed between the endpoint and every request path
    pub api_prefix: String,

    /// Authentication method
    pub auth_method: AuthMethod,

    /// Optional timeout for requests in seconds (default: 30)
    pub timeout_seconds: Option<u64>,

    /// Optional custom headers to send with each request
    pub headers: Vec<(String, String)>,

    /// Accept invalid TLS certificates
    pub insecure: bool,
}

impl Default for RestTransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost:9443".to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            auth_method: AuthMethod::None,
            timeout_seconds: Some(30),
            headers: Vec::new(),
            insecure: false,
        }
    }
}

impl RestTransportConfig {
    /// Create a new REST transport configuration
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Read the configuration from `STORAGEGRID_ADDRESS`, `STORAGEGRID_TOKEN`
    /// and `STORAGEGRID_INSECURE`
    pub fn from_env() -> Result<Self, TransportError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TransportError> {
        let endpoint = lookup(ADDRESS_VARIABLE)
            .filter(|address| !address.is_empty())
            .ok_or_else(|| {
                TransportError::InvalidConfig(format!("{ADDRESS_VARIABLE} is not set"))
            })?;

        let mut config = Self::new(endpoint);

        if let Some(token) = lookup(TOKEN_VARIABLE).filter(|token| !token.is_empty()) {
            config = config.with_auth(AuthMethod::Bearer(token));
        }

        if let Some(insecure) = lookup(INSECURE_VARIABLE) {
            config = config.with_insecure(matches!(insecure.trim(), "true" | "1"));
        }

        Ok(config)
    }

    /// Set the API path prefix
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Set the authentication method
    pub fn with_auth(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Add a custom header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Accept (or reject) invalid TLS certificates
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}

/// REST transport implementation
///
/// Sends JSON payloads to `{endpoint}{api_prefix}{path}` and checks the
/// response status against the one the caller expects.
///
/// # Examples
///
/// ```no_run
/// use storagrid_remote::transport::{
///     AuthMethod, Method, RestTransport, RestTransportConfig, StatusCode, Transport,
/// };
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RestTransportConfig::new("https://grid.example.com:9443")
///     .with_auth(AuthMethod::Bearer("my-token".to_string()))
///     .with_timeout(60);
///
/// let transport = RestTransport::new(config)?;
/// let response = transport
///     .send(Method::GET, "/org/containers/logs/region", None, StatusCode::OK)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct RestTransport {
    config: RestTransportConfig,
    base: String,
    client: Client,
}

impl RestTransport {
    /// Create a new REST transport with the given configuration
    pub fn new(config: RestTransportConfig) -> Result<Self, TransportError> {
        Url::parse(&config.endpoint).map_err(|error| {
            TransportError::InvalidConfig(format!(
                "Invalid endpoint '{}': {}",
                config.endpoint, error
            ))
        })?;

        let mut client_builder = Client::builder().danger_accept_invalid_certs(config.insecure);

        if let Some(timeout) = config.timeout_seconds {
            client_builder = client_builder.timeout(std::time::Duration::from_secs(timeout));
        }

        let client = client_builder
            .build()
            .map_err(|error| TransportError::InvalidConfig(error.to_string()))?;

        let base = format!(
            "{}{}",
            config.endpoint.trim_end_matches('/'),
            config.api_prefix.trim_end_matches('/')
        );

        Ok(Self {
            config,
            base,
            client,
        })
    }

    /// Get the URL for a request path
    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Build a request with authentication and custom headers
    fn build_request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut builder = builder.header(CONTENT_TYPE, "application/json");

        match &self.config.auth_method {
            AuthMethod::None => {}
            AuthMethod::Bearer(token) => {
                builder = builder.bearer_auth(token);
            }
        }

        for (key, value) in &self.config.headers {
            builder = builder.header(key, value);
        }

        builder
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<Vec<u8>>,
        expected: StatusCode,
    ) -> Result<Response, TransportError> {
        let url = self.url_for(path);
        tracing::trace!(%method, %url, "Sending request");

        let mut request = self.build_request(self.client.request(method, &url));
        if let Some(payload) = payload {
            request = request.body(payload);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        if status != expected {
            tracing::debug!(%url, %status, %expected, "Unexpected response status");
            return Err(TransportError::UnexpectedStatus {
                status,
                expected,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(Response {
            body,
            headers,
            status,
        })
    }
}
