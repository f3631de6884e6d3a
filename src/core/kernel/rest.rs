use crate::core::config::ConfigError;
use crate::core::errors::ApiError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

/// Raw HTTP response handed back by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

/// HTTP transport trait
///
/// The dispatcher only ever needs a GET on a fully built URL, so this is the one seam
/// between the client and the network. Tests substitute an in-memory implementation.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a GET request on an absolute URL
    ///
    /// Non-2xx statuses are returned as a normal response; only failures to obtain a
    /// response at all (timeouts, refused or reset connections) are errors.
    async fn get(&self, url: &str) -> Result<TransportResponse, ApiError>;

    /// Release pooled connections. Later requests fail with `ClientClosed`.
    async fn close(&self);
}

/// Configuration for the REST transport
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Total time allowed for one request, connect included
    pub timeout: Duration,
    /// Time allowed to establish the TCP/TLS connection
    pub connect_timeout: Duration,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(5),
            user_agent: format!("Rust: arez {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RestClientConfig {
    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for creating REST transport instances
pub struct RestClientBuilder {
    config: RestClientConfig,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self { config }
    }

    /// Build the transport, creating its connection pool
    pub fn build(self) -> Result<ReqwestRest, ApiError> {
        let client = Client::builder()
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ConfigError::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(ReqwestRest {
            client: RwLock::new(Some(client)),
            config: self.config,
        })
    }
}

/// Implementation of `HttpTransport` using reqwest
pub struct ReqwestRest {
    // `None` once closed; dropping the last handle releases the pool.
    client: RwLock<Option<Client>>,
    config: RestClientConfig,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    /// Create a transport with default settings
    pub fn new() -> Result<Self, ApiError> {
        RestClientBuilder::new(RestClientConfig::default()).build()
    }
}

#[async_trait]
impl HttpTransport for ReqwestRest {
    #[instrument(skip(self, url))]
    async fn get(&self, url: &str) -> Result<TransportResponse, ApiError> {
        // clone the handle so in-flight requests survive a concurrent close
        let client = self
            .client
            .read()
            .await
            .clone()
            .ok_or(ApiError::ClientClosed)?;

        let response = client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            ApiError::TransportFailure(format!("Failed to read response body: {}", e))
        })?;

        trace!("Response body: {}", body);
        Ok(TransportResponse { status, body })
    }

    async fn close(&self) {
        if self.client.write().await.take().is_some() {
            debug!("HTTP connection pool released");
        }
    }
}
