//! Common imports for quick starts.

// Common
pub use crate::{Error, Result};

// Client
pub use crate::{StreamClient, StreamClientBuilder};

// Feeds and their records
pub use crate::{Activity, Feed, FeedKind, FeedPage};

// Tokens for downstream clients
pub use crate::{Resource, Scope};
