//! Fan-out (`to`) target reconciliation.
//!
//! Both operations address the activity by `foreign_id` and `time` and always
//! take exactly one request. In particular a replace is never emulated as a
//! remove followed by an add: concurrent readers would see the activity with
//! no targets in between.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use stream_common::token::{Resource, Scope};

use super::Feed;
use crate::activity::time_format;
use crate::util::{decode, dedup_preserving_order};
use crate::{Activity, Error, Result};

#[derive(Debug, Serialize)]
struct ToTargetsBody<'a> {
    foreign_id: &'a str,
    time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_targets: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    added_targets: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    removed_targets: Vec<String>,
}

/// The service's view of an activity after its targets changed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToTargetsResponse {
    /// The activity as now stored, when the service includes it.
    #[serde(default)]
    pub activity: Option<Activity>,
    /// Targets that were added.
    #[serde(default)]
    pub added: Vec<String>,
    /// Targets that were removed.
    #[serde(default)]
    pub removed: Vec<String>,
    /// The full target list after a replace.
    #[serde(default)]
    pub new: Vec<String>,
    /// Server-side processing time.
    #[serde(default)]
    pub duration: String,
}

impl Feed {
    /// Add and remove `to` targets of `activity` in one request.
    ///
    /// `activity` must carry both `foreign_id` and `time`; it is only used to
    /// address the stored activity, its own `to` list is ignored. Targets are
    /// sent as canonical feed ids, each list deduplicated in order.
    ///
    /// The service drops the removed targets, then appends the added ones in
    /// the given order after those that remain; a feed in both lists ends up
    /// present. Repeating the same call changes nothing.
    ///
    /// # Examples
    /// ```no_run
    /// # use stream_feeds::{Activity, Feed};
    /// # async fn example(feed: Feed, activity: Activity, f2: Feed, f3: Feed) -> stream_feeds::Result<()> {
    /// feed.update_to_targets(&activity, &[&f2], &[&f3]).await?;
    /// # Ok(()) }
    /// ```
    pub async fn update_to_targets(
        &self,
        activity: &Activity,
        adds: &[&Feed],
        removes: &[&Feed],
    ) -> Result<ToTargetsResponse> {
        let time = require_identity(activity)?;
        if adds.is_empty() && removes.is_empty() {
            return Err(Error::validation("no targets to add or remove"));
        }

        let body = ToTargetsBody {
            foreign_id: &activity.foreign_id,
            time,
            new_targets: None,
            added_targets: canonical_ids(adds),
            removed_targets: canonical_ids(removes),
        };

        tracing::info!(
            "Updating targets of {} in {}: +{} -{}",
            activity.foreign_id,
            self.id,
            body.added_targets.len(),
            body.removed_targets.len()
        );
        self.send_targets(&body).await
    }

    /// Replace the whole `to` list of `activity` with `targets`, in order, in
    /// one request.
    ///
    /// Same addressing rules as [`Feed::update_to_targets`]. An empty `targets`
    /// clears the list.
    pub async fn replace_to_targets(
        &self,
        activity: &Activity,
        targets: &[&Feed],
    ) -> Result<ToTargetsResponse> {
        let time = require_identity(activity)?;

        let body = ToTargetsBody {
            foreign_id: &activity.foreign_id,
            time,
            new_targets: Some(canonical_ids(targets)),
            added_targets: Vec::new(),
            removed_targets: Vec::new(),
        };

        tracing::info!(
            "Replacing targets of {} in {} with {} feeds",
            activity.foreign_id,
            self.id,
            targets.len()
        );
        self.send_targets(&body).await
    }

    async fn send_targets(&self, body: &ToTargetsBody<'_>) -> Result<ToTargetsResponse> {
        let path = format!(
            "feed_targets/{}/{}/activity_to_targets",
            self.slug(),
            self.user_id()
        );
        let req = self
            .api_request(Method::POST, path, Scope::Write, Resource::FeedTargets)
            .json(body)?;
        let response = self.client.call(req).await?;
        if response.body.is_empty() {
            return Ok(ToTargetsResponse::default());
        }
        decode(&response)
    }
}

/// The wire form of `time`, if the activity can be addressed without its id.
fn require_identity(activity: &Activity) -> Result<String> {
    match (&activity.foreign_id, &activity.time) {
        (foreign_id, Some(time)) if !foreign_id.is_empty() => Ok(time_format::format(time)),
        _ => Err(Error::precondition(
            "cannot change targets of an activity without both foreign_id and time",
        )),
    }
}

fn canonical_ids(feeds: &[&Feed]) -> Vec<String> {
    dedup_preserving_order(feeds.iter().map(|feed| feed.id()).collect())
}
