//! Constants used across Stream feed clients.

/// Production API root. Paths are appended directly, so it ends with `/`.
pub const DEFAULT_API_URL: &str = "https://api.getstream.io/api/v1.0/";

/// Environment variables read by clients constructed from the environment.
pub mod env {
    /// Overrides [`super::DEFAULT_API_URL`] when set to a non-empty value.
    pub const API_URL: &str = "STREAM_API_URL";
    /// The account's API key.
    pub const API_KEY: &str = "STREAM_API_KEY";
    /// The account's API secret.
    pub const API_SECRET: &str = "STREAM_API_SECRET";
}

/// HTTP header names understood by the feed service.
pub mod headers {
    /// Tells the service how to interpret the `Authorization` header (`Stream-Auth-Type`).
    pub const AUTH_TYPE: &str = "stream-auth-type";
    /// The only auth type this library emits.
    pub const AUTH_TYPE_JWT: &str = "jwt";
}

/// Feed id used in tokens that are not scoped to a single feed.
pub const ALL_FEEDS: &str = "*";
