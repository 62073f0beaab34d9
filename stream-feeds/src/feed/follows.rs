use chrono::NaiveDateTime;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use stream_common::token::{Resource, Scope};

use super::{Feed, segment};
use crate::activity::time_format;
use crate::util::decode;
use crate::{Error, Result};

#[derive(Serialize)]
struct FollowBody {
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    activity_copy_limit: Option<u32>,
}

/// Pagination for follower listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Number of results to skip.
    pub offset: Option<u32>,
}

/// One follow relationship: `feed_id` follows `target_id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Follow {
    /// Canonical id of the following feed.
    pub feed_id: String,
    /// Canonical id of the followed feed.
    pub target_id: String,
    /// When the relationship was created.
    #[serde(default, deserialize_with = "time_format::deserialize")]
    pub created_at: Option<NaiveDateTime>,
    /// When the relationship last changed.
    #[serde(default, deserialize_with = "time_format::deserialize")]
    pub updated_at: Option<NaiveDateTime>,
}

/// A page of follow relationships.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FollowsResponse {
    /// Relationships on this page.
    #[serde(default)]
    pub results: Vec<Follow>,
    /// Server-side processing time.
    #[serde(default)]
    pub duration: String,
}

impl Feed {
    /// Make this feed follow `target`, copying the target's recent activities.
    ///
    /// `activity_copy_limit` caps how many existing activities are copied; the
    /// service default applies when `None`.
    pub async fn follow(&self, target: &Feed, activity_copy_limit: Option<u32>) -> Result<()> {
        if target == self {
            return Err(Error::validation(format!("{} cannot follow itself", self.id)));
        }

        tracing::info!("{} follows {}", self.id, target.id);

        let body = FollowBody {
            target: target.id(),
            activity_copy_limit,
        };
        let req = self
            .api_request(
                Method::POST,
                format!("{}/follows", self.path()),
                Scope::Write,
                Resource::Follower,
            )
            .json(&body)?;
        self.client.call(req).await.map(drop)
    }

    /// Stop following `target`. With `keep_history` the activities already
    /// copied from it stay in this feed.
    ///
    /// Unfollowing a feed that is not followed succeeds.
    pub async fn unfollow(&self, target: &Feed, keep_history: bool) -> Result<()> {
        tracing::info!("{} unfollows {}", self.id, target.id);

        let path = format!("{}/follows/{}", self.path(), segment(&target.id())?);
        let mut req = self.api_request(Method::DELETE, path, Scope::Write, Resource::Follower);
        if keep_history {
            req = req.query("keep_history", 1);
        }
        match self.client.call(req).await {
            Err(Error::Request(ref err)) if err.is_not_found() => Ok(()),
            other => other.map(drop),
        }
    }

    /// Feeds following this one.
    pub async fn followers(&self, page: Page) -> Result<FollowsResponse> {
        let path = format!("{}/followers", self.path());
        self.list_follows(path, page, &[]).await
    }

    /// Feeds this one follows, restricted to `filter` when it is not empty.
    pub async fn following(&self, page: Page, filter: &[&Feed]) -> Result<FollowsResponse> {
        let path = format!("{}/follows", self.path());
        self.list_follows(path, page, filter).await
    }

    async fn list_follows(&self, path: String, page: Page, filter: &[&Feed]) -> Result<FollowsResponse> {
        let mut req = self.api_request(Method::GET, path, Scope::Read, Resource::Follower);
        if let Some(limit) = page.limit {
            req = req.query("limit", limit);
        }
        if let Some(offset) = page.offset {
            req = req.query("offset", offset);
        }
        if !filter.is_empty() {
            let ids: Vec<String> = filter.iter().map(|feed| feed.id()).collect();
            req = req.query("filter", ids.join(","));
        }
        let response = self.client.call(req).await?;
        decode(&response)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::StreamClient;

    fn client(server: &MockServer) -> StreamClient {
        StreamClient::builder()
            .api_key("key")
            .api_secret("secret")
            .base_url(server.url("/api/v1.0/"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn follow_and_unfollow() {
        let server = MockServer::start_async().await;
        let follow = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1.0/feed/timeline/alice/follows/")
                    .json_body(json!({"target": "user:bob", "activity_copy_limit": 10}));
                then.status(201).json_body(json!({"duration": "1ms"}));
            })
            .await;
        let unfollow = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/api/v1.0/feed/timeline/alice/follows/user:bob/")
                    .query_param("keep_history", "1");
                then.status(200).json_body(json!({"duration": "1ms"}));
            })
            .await;

        let client = client(&server);
        let timeline = client.flat_feed("timeline", "alice").unwrap();
        let bob = client.flat_feed("user", "bob").unwrap();

        timeline.follow(&bob, Some(10)).await.unwrap();
        timeline.unfollow(&bob, true).await.unwrap();

        follow.assert_async().await;
        unfollow.assert_async().await;
    }

    #[tokio::test]
    async fn following_with_filter() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1.0/feed/timeline/alice/follows/")
                    .query_param("limit", "5")
                    .query_param("filter", "user:bob,user:carol");
                then.status(200).json_body(json!({
                    "results": [{
                        "feed_id": "timeline:alice",
                        "target_id": "user:bob",
                        "created_at": "2017-05-02T10:11:12.000000",
                        "updated_at": "2017-05-02T10:11:12.000000"
                    }],
                    "duration": "2ms"
                }));
            })
            .await;

        let client = client(&server);
        let timeline = client.flat_feed("timeline", "alice").unwrap();
        let bob = client.flat_feed("user", "bob").unwrap();
        let carol = client.flat_feed("user", "carol").unwrap();

        let page = Page {
            limit: Some(5),
            offset: None,
        };
        let resp = timeline.following(page, &[&bob, &carol]).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].target_id, "user:bob");
    }

    #[tokio::test]
    async fn cannot_follow_itself() {
        let client = StreamClient::new("key", "secret").unwrap();
        let feed = client.flat_feed("user", "bob").unwrap();
        assert!(matches!(
            feed.follow(&feed, None).await,
            Err(Error::Request(crate::errors::RequestError::Validation { .. }))
        ));
    }
}
