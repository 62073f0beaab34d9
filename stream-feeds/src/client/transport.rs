use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, header::HeaderMap};
use url::Url;

use crate::errors::{ConfigError, TransportError};

const DEFAULT_USER_AGENT: &str = concat!("stream-feeds-rust", "@", env!("CARGO_PKG_VERSION"),);

/// A fully shaped request, ready to be sent.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including the `api_key` query parameter.
    pub url: Url,
    /// Authentication and content headers.
    pub headers: HeaderMap,
    /// Serialized JSON body, if any.
    pub body: Option<Vec<u8>>,
}

/// Status and raw body of a response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// Executes HTTP requests on behalf of a [`crate::StreamClient`].
///
/// The client only shapes requests and interprets responses; connection
/// pooling, TLS, timeouts and retries are the transport's business. Implement
/// this to plug in a different stack, or an in-memory service for tests.
#[async_trait]
pub trait HttpTransport: Debug + Send + Sync {
    /// Send `request` and return the response, or the transport failure unchanged.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default [`HttpTransport`] backed by a [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the default user agent and no global timeout.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_options(None, None)
    }

    /// Build a transport with an optional request timeout and an extra
    /// user-agent segment appended after `stream-feeds-rust@<version>`.
    pub fn with_options(
        timeout: Option<Duration>,
        user_agent_extra: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let user_agent = match user_agent_extra {
            Some(extra) if !extra.trim().is_empty() => {
                format!("{DEFAULT_USER_AGENT} {}", extra.trim())
            }
            _ => DEFAULT_USER_AGENT.to_string(),
        };

        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
        })
    }

    /// Wrap an already configured [`reqwest::Client`].
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut rb = self
            .http
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            rb = rb.body(body);
        }

        let response = rb.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, body })
    }
}
