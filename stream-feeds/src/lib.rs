#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(any(), deny(clippy::unwrap_used))]

pub mod activity;
mod client;
pub mod errors;
mod feed;
mod util;

pub mod prelude;

// --- PUBLIC API EXPORTS ---
// Client and transport
pub use client::core::{StreamClient, StreamClientBuilder};
pub use client::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
// Feeds
pub use feed::{
    ActivityGroup, AddActivitiesResponse, Feed, FeedKind, FeedPage, FlatFeedResponse, Follow,
    FollowsResponse, GroupedFeedResponse, Mark, Page, ReadBuilder, ReadOptions, ToTargetsResponse,
};
// Activities
pub use activity::Activity;

// Error types
pub use errors::{ConfigError, Error, RequestError, Result};

// Re-exports
pub use reqwest::{Method, StatusCode};
pub use stream_common::{
    constants::DEFAULT_API_URL,
    feed_id::FeedId,
    token::{Resource, Scope},
};
