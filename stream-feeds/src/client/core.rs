use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::Serialize;

use stream_common::{
    constants::{env, headers as stream_headers},
    feed_id::FeedId,
    token::{self, Resource, Scope},
};

use super::endpoint::{Endpoints, resolve_base_url};
use super::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::errors::{ConfigError, Error, RequestError, Result};
use crate::feed::{Feed, FeedKind};
use crate::util::check_status;

#[derive(Debug, Default)]
#[must_use]
/// Configures a [`StreamClient`] before construction.
///
/// # Defaults
/// - Base URL: the `STREAM_API_URL` environment variable when non-empty,
///   otherwise [`stream_common::constants::DEFAULT_API_URL`]
/// - HTTP request timeout: reqwest default (no global timeout) unless set via
///   [`Self::request_timeout`]
/// - User-agent: `stream-feeds-rust@<crate-version>` plus any [`Self::user_agent_extra`]
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// # use stream_feeds::StreamClient;
/// let client = StreamClient::builder()
///     .api_key("key")
///     .api_secret("secret")
///     .request_timeout(Duration::from_secs(10))
///     .user_agent_extra("myapp/1.2.3")
///     .build()?;
/// # Ok::<_, stream_feeds::Error>(())
/// ```
pub struct StreamClientBuilder {
    api_key: Option<String>,
    api_secret: Option<String>,
    base_url: Option<String>,
    http_request_timeout: Option<Duration>,

    /// Optional user-agent segment appended to the default UA for app-level telemetry.
    user_agent_extra: Option<String>,

    transport: Option<Arc<dyn HttpTransport>>,
}

impl StreamClientBuilder {
    /// The account's API key, sent as `api_key` on every request.
    pub fn api_key<S: Into<String>>(&mut self, key: S) -> &mut Self {
        self.api_key = Some(key.into());
        self
    }

    /// The account's API secret, used only to sign tokens locally.
    pub fn api_secret<S: Into<String>>(&mut self, secret: S) -> &mut Self {
        self.api_secret = Some(secret.into());
        self
    }

    /// Use `url` as the API root instead of the environment or default one.
    ///
    /// Used verbatim; it should end with `/`.
    pub fn base_url<S: Into<String>>(&mut self, url: S) -> &mut Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set HTTP requests timeout on the default transport.
    pub fn request_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.http_request_timeout = Some(timeout);
        self
    }

    /// Append an extra user-agent segment after the default `stream-feeds-rust@<version>`.
    pub fn user_agent_extra<S: Into<String>>(&mut self, extra: S) -> &mut Self {
        self.user_agent_extra = Some(extra.into());
        self
    }

    /// Send requests through `transport` instead of the default reqwest one.
    ///
    /// Timeout and user-agent settings are then the transport's own concern.
    pub fn transport<T: HttpTransport + 'static>(&mut self, transport: T) -> &mut Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Build [StreamClient]
    pub fn build(&self) -> Result<StreamClient> {
        let api_key = match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(ConfigError::MissingApiKey.into()),
        };
        let api_secret = match self.api_secret.as_deref() {
            Some(secret) if !secret.is_empty() => secret,
            _ => return Err(ConfigError::MissingApiSecret.into()),
        };

        let env_url = std::env::var(env::API_URL).ok();
        let root = resolve_base_url(self.base_url.as_deref(), env_url.as_deref());
        let endpoints = Endpoints::new(root, api_key)?;

        let transport: Arc<dyn HttpTransport> = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(ReqwestTransport::with_options(
                self.http_request_timeout,
                self.user_agent_extra.as_deref(),
            )?),
        };

        tracing::debug!("Stream client configured for {}", endpoints.root());

        Ok(StreamClient {
            inner: Arc::new(Inner {
                endpoints,
                api_secret: api_secret.to_string(),
            }),
            transport,
        })
    }
}

struct Inner {
    endpoints: Endpoints,
    api_secret: String,
}

impl Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret.
        f.debug_struct("Inner")
            .field("root", &self.endpoints.root())
            .finish_non_exhaustive()
    }
}

/// Client for the Stream feed service.
///
/// `StreamClient` holds the account's API key and secret plus an
/// [`HttpTransport`], all fixed at construction. Every operation is a pure
/// function of that configuration and its arguments, so a client can be cloned
/// cheaply and shared across tasks without locking.
///
/// ### Construction
/// Use [`StreamClient::new()`] with a key and secret, [`StreamClient::from_env()`],
/// or [`StreamClient::builder()`] to tweak the base URL, timeouts or transport.
///
/// ### Examples
/// ```no_run
/// # use stream_feeds::StreamClient;
/// let client = StreamClient::new("key", "secret")?;
/// let timeline = client.flat_feed("timeline", "alice")?;
/// let browser_token = timeline.token(true)?;
/// # Ok::<_, stream_feeds::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct StreamClient {
    inner: Arc<Inner>,
    transport: Arc<dyn HttpTransport>,
}

impl StreamClient {
    /// Creates a client with the given credentials and default settings.
    pub fn new<K: Into<String>, S: Into<String>>(api_key: K, api_secret: S) -> Result<Self> {
        Self::builder().api_key(api_key).api_secret(api_secret).build()
    }

    /// Creates a client from `STREAM_API_KEY`, `STREAM_API_SECRET` and,
    /// optionally, `STREAM_API_URL`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(env::API_KEY)
            .ok()
            .ok_or(ConfigError::MissingEnv(env::API_KEY))?;
        let secret = std::env::var(env::API_SECRET)
            .ok()
            .ok_or(ConfigError::MissingEnv(env::API_SECRET))?;
        Self::new(key, secret)
    }

    /// Returns a builder to edit settings before creating [`StreamClient`].
    pub fn builder() -> StreamClientBuilder {
        StreamClientBuilder::default()
    }

    // === Feeds ===

    /// A handle on the flat feed `slug:user_id`.
    pub fn flat_feed(&self, slug: &str, user_id: &str) -> Result<Feed> {
        self.feed(FeedKind::Flat, slug, user_id)
    }

    /// A handle on the aggregated feed `slug:user_id`.
    pub fn aggregated_feed(&self, slug: &str, user_id: &str) -> Result<Feed> {
        self.feed(FeedKind::Aggregated, slug, user_id)
    }

    /// A handle on the notification feed `slug:user_id`.
    pub fn notification_feed(&self, slug: &str, user_id: &str) -> Result<Feed> {
        self.feed(FeedKind::Notification, slug, user_id)
    }

    /// A handle on feed `slug:user_id` of the given kind.
    pub fn feed(&self, kind: FeedKind, slug: &str, user_id: &str) -> Result<Feed> {
        Ok(Feed::new(self.clone(), kind, FeedId::new(slug, user_id)?))
    }

    // === Tokens ===

    /// Sign a token granting `scope` on `resource` for `feed_id`.
    ///
    /// `feed_id` is the token form of a feed (see [`FeedId::token_id`]) or `*`.
    pub fn sign_token(&self, scope: Scope, resource: Resource, feed_id: &str) -> Result<String> {
        Ok(token::sign(&self.inner.api_secret, scope, resource, feed_id)?)
    }

    // === Requests ===

    /// Build, authenticate and execute `req`, returning a 2xx response.
    pub(crate) async fn call(&self, req: ApiRequest) -> Result<HttpResponse> {
        let mut url = self.inner.endpoints.build(&req.path)?;
        if !req.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &req.query {
                pairs.append_pair(k, v);
            }
        }

        let token = self.sign_token(req.scope, req.resource, &req.token_feed_id)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&token).map_err(|err| Error::validation(err.to_string()))?,
        );
        headers.insert(
            stream_headers::AUTH_TYPE,
            HeaderValue::from_static(stream_headers::AUTH_TYPE_JWT),
        );
        if req.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        tracing::debug!("{} {}", req.method, req.path);

        let response = self
            .transport
            .execute(HttpRequest {
                method: req.method,
                url,
                headers,
                body: req.body,
            })
            .await
            .map_err(RequestError::Transport)?;

        check_status(response)
    }
}

/// One outbound call: where it goes and what its token grants.
#[derive(Debug)]
pub(crate) struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    scope: Scope,
    resource: Resource,
    token_feed_id: String,
    body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub(crate) fn new(
        method: Method,
        path: String,
        scope: Scope,
        resource: Resource,
        token_feed_id: String,
    ) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            scope,
            resource,
            token_feed_id,
            body: None,
        }
    }

    pub(crate) fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub(crate) fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }
}
