use reqwest::Method;
use serde::{Deserialize, Serialize};
use stream_common::{
    constants::ALL_FEEDS,
    token::{Resource, Scope},
};

use super::{Feed, segment};
use crate::client::core::ApiRequest;
use crate::errors::RequestError;
use crate::util::decode;
use crate::{Activity, Error, Result, StreamClient};

#[derive(Serialize)]
struct ActivitiesBody<'a> {
    activities: &'a [Activity],
}

/// The activities as stored by the service after an add.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddActivitiesResponse {
    /// Stored activities, in submission order, each with its assigned `id`.
    #[serde(default)]
    pub activities: Vec<Activity>,
    /// Server-side processing time.
    #[serde(default)]
    pub duration: String,
}

impl Feed {
    /// Add one activity to this feed and return it as stored.
    ///
    /// See [`Feed::add_activities`].
    pub async fn add_activity(&self, activity: &Activity) -> Result<Activity> {
        self.add_activities(std::slice::from_ref(activity))
            .await?
            .activities
            .into_iter()
            .next()
            .ok_or_else(|| {
                RequestError::DecodeJson {
                    message: "add response contained no activity".into(),
                }
                .into()
            })
    }

    /// Add activities to this feed in a single request.
    ///
    /// Adding an activity whose `foreign_id` and `time` match one already in the
    /// feed updates that activity instead of creating a duplicate. That matching
    /// happens on the service; nothing is deduplicated here.
    ///
    /// # Examples
    /// ```no_run
    /// # use stream_feeds::Activity;
    /// # async fn example(feed: stream_feeds::Feed) -> stream_feeds::Result<()> {
    /// let stored = feed
    ///     .add_activities(&[
    ///         Activity::new("bob", "like", "ice-cream"),
    ///         Activity::new("alice", "dislike", "ice-cream"),
    ///     ])
    ///     .await?;
    /// assert_eq!(stored.activities.len(), 2);
    /// # Ok(()) }
    /// ```
    pub async fn add_activities(&self, activities: &[Activity]) -> Result<AddActivitiesResponse> {
        if activities.is_empty() {
            return Err(Error::validation("no activities to add"));
        }
        for activity in activities {
            activity.validate()?;
        }

        tracing::info!("Adding {} activities to {}", activities.len(), self.id);

        let req = self
            .api_request(Method::POST, self.path(), Scope::Write, Resource::Feed)
            .json(&ActivitiesBody { activities })?;
        let response = self.client.call(req).await?;
        decode(&response)
    }

    /// Overwrite activities with the given full payloads.
    ///
    /// Delegates to [`StreamClient::update_activities`]; the activities do not
    /// have to belong to this feed.
    pub async fn update_activities(&self, activities: &[Activity]) -> Result<()> {
        self.client.update_activities(activities).await
    }

    /// Remove the activity with service id `id` from this feed.
    ///
    /// Removing an activity that does not exist (anymore) succeeds.
    pub async fn remove_activity_by_id(&self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(Error::validation("activity id must not be empty"));
        }

        tracing::info!("Removing activity {id} from {}", self.id);

        let path = format!("{}/{}", self.path(), segment(id)?);
        let req = self.api_request(Method::DELETE, path, Scope::Write, Resource::Feed);
        ignore_not_found(self.client.call(req).await.map(drop))
    }

    /// Remove the activity with `foreign_id` from this feed.
    ///
    /// Removing an activity that does not exist (anymore) succeeds.
    pub async fn remove_activity_by_foreign_id(&self, foreign_id: &str) -> Result<()> {
        if foreign_id.is_empty() {
            return Err(Error::validation("foreign id must not be empty"));
        }

        tracing::info!("Removing activity with foreign id {foreign_id} from {}", self.id);

        let path = format!("{}/{}", self.path(), segment(foreign_id)?);
        let req = self
            .api_request(Method::DELETE, path, Scope::Write, Resource::Feed)
            .query("foreign_id", 1);
        ignore_not_found(self.client.call(req).await.map(drop))
    }
}

impl StreamClient {
    /// Overwrite existing activities with the given full payloads.
    ///
    /// Each activity is matched by its `id`, or by `foreign_id` and `time`; an
    /// activity with neither is rejected before anything is sent. The service
    /// fails the call when an activity matches no stored record.
    pub async fn update_activities(&self, activities: &[Activity]) -> Result<()> {
        if activities.is_empty() {
            return Err(Error::validation("no activities to update"));
        }
        for activity in activities {
            activity.validate()?;
            if activity.id.is_empty() && !activity.has_stable_identity() {
                return Err(Error::precondition(
                    "updated activities need an id, or both foreign_id and time",
                ));
            }
        }

        tracing::info!("Updating {} activities", activities.len());

        let req = ApiRequest::new(
            Method::POST,
            "activities".to_string(),
            Scope::Write,
            Resource::Activities,
            ALL_FEEDS.to_string(),
        )
        .json(&ActivitiesBody { activities })?;
        self.call(req).await.map(drop)
    }
}

/// Deletes are idempotent: a 404 means the activity is already gone.
fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Err(Error::Request(ref err)) if err.is_not_found() => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn client(server: &MockServer) -> StreamClient {
        StreamClient::builder()
            .api_key("key")
            .api_secret("secret")
            .base_url(server.url("/api/v1.0/"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn add_activities_posts_wrapped_list() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1.0/feed/flat/123/")
                    .query_param("api_key", "key")
                    .header("stream-auth-type", "jwt")
                    .json_body(json!({"activities": [
                        {"actor": "bob", "verb": "like", "object": "ice-cream"},
                        {"actor": "alice", "verb": "dislike", "object": "ice-cream"}
                    ]}));
                then.status(201).json_body(json!({
                    "activities": [
                        {"id": "1", "actor": "bob", "verb": "like", "object": "ice-cream"},
                        {"id": "2", "actor": "alice", "verb": "dislike", "object": "ice-cream"}
                    ],
                    "duration": "12ms"
                }));
            })
            .await;

        let feed = client(&server).flat_feed("flat", "123").unwrap();
        let resp = feed
            .add_activities(&[
                Activity::new("bob", "like", "ice-cream"),
                Activity::new("alice", "dislike", "ice-cream"),
            ])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(resp.activities.len(), 2);
        assert!(resp.activities.iter().all(|a| !a.id.is_empty()));
    }

    #[tokio::test]
    async fn add_rejects_incomplete_activity_without_request() {
        let client = StreamClient::new("key", "secret").unwrap();
        let feed = client.flat_feed("flat", "1").unwrap();
        assert!(matches!(
            feed.add_activity(&Activity::new("bob", "", "x")).await,
            Err(Error::Request(RequestError::Validation { .. }))
        ));
        assert!(matches!(
            feed.add_activities(&[]).await,
            Err(Error::Request(RequestError::Validation { .. }))
        ));
        assert!(matches!(
            feed.add_activity(&Activity::new("bob", "like", "x").with_extra("actor", ""))
                .await,
            Err(Error::Request(RequestError::Validation { .. }))
        ));
    }

    #[tokio::test]
    async fn update_posts_to_activities_endpoint() {
        let server = MockServer::start_async().await;
        let token = stream_common::token::sign("secret", Scope::Write, Resource::Activities, "*")
            .unwrap();
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1.0/activities/")
                    .header("authorization", token.as_str())
                    .json_body(json!({"activities": [{
                        "actor": "bob",
                        "verb": "like",
                        "object": "ice-cream",
                        "foreign_id": "bob:123",
                        "time": "2017-05-02T10:11:12.000000",
                        "influence": 42
                    }]}));
                then.status(201).json_body(json!({"duration": "3ms"}));
            })
            .await;

        let time = NaiveDate::from_ymd_opt(2017, 5, 2)
            .unwrap()
            .and_hms_opt(10, 11, 12)
            .unwrap();
        let feed = client(&server).flat_feed("flat", "123").unwrap();
        feed.update_activities(&[Activity::new("bob", "like", "ice-cream")
            .with_foreign_id("bob:123")
            .with_time(time)
            .with_extra("influence", 42)])
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_requires_an_identity() {
        let client = StreamClient::new("key", "secret").unwrap();
        assert!(matches!(
            client
                .update_activities(&[Activity::new("bob", "like", "x").with_foreign_id("f")])
                .await,
            Err(Error::Precondition { .. })
        ));
    }

    #[tokio::test]
    async fn remove_by_id_and_foreign_id_shapes() {
        let server = MockServer::start_async().await;
        let by_id = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/api/v1.0/feed/flat/123/abc-1/");
                then.status(200).json_body(json!({"removed": "abc-1"}));
            })
            .await;
        let by_foreign_id = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/api/v1.0/feed/flat/123/bob:123/")
                    .query_param("foreign_id", "1");
                then.status(200).json_body(json!({"removed": "bob:123"}));
            })
            .await;

        let feed = client(&server).flat_feed("flat", "123").unwrap();
        feed.remove_activity_by_id("abc-1").await.unwrap();
        feed.remove_activity_by_foreign_id("bob:123").await.unwrap();

        by_id.assert_async().await;
        by_foreign_id.assert_async().await;
    }

    #[tokio::test]
    async fn remove_rejects_dot_segments_without_request() {
        let server = MockServer::start_async().await;
        let any_delete = server
            .mock_async(|when, then| {
                when.method(DELETE);
                then.status(200).json_body(json!({}));
            })
            .await;

        let feed = client(&server).flat_feed("flat", "123").unwrap();
        for id in [".", ".."] {
            assert!(matches!(
                feed.remove_activity_by_id(id).await,
                Err(Error::Request(RequestError::Validation { .. }))
            ));
            assert!(matches!(
                feed.remove_activity_by_foreign_id(id).await,
                Err(Error::Request(RequestError::Validation { .. }))
            ));
        }

        any_delete.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn remove_missing_activity_is_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/api/v1.0/feed/flat/123/gone/");
                then.status(404)
                    .json_body(json!({"detail": "activity not found", "status_code": 404}));
            })
            .await;

        let feed = client(&server).flat_feed("flat", "123").unwrap();
        feed.remove_activity_by_id("gone").await.unwrap();
    }

    #[tokio::test]
    async fn other_delete_failures_propagate() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/api/v1.0/feed/flat/123/x/");
                then.status(403).json_body(json!({"detail": "forbidden"}));
            })
            .await;

        let feed = client(&server).flat_feed("flat", "123").unwrap();
        match feed.remove_activity_by_id("x").await {
            Err(Error::Request(RequestError::Server { status, message })) => {
                assert_eq!(status, reqwest::StatusCode::FORBIDDEN);
                assert_eq!(message, "forbidden");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
