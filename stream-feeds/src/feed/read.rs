use std::marker::PhantomData;

use chrono::NaiveDateTime;
use reqwest::Method;
use serde::{Deserialize, de::DeserializeOwned};
use stream_common::token::{Resource, Scope};
use url::Url;

use super::Feed;
use crate::activity::time_format;
use crate::util::decode;
use crate::{Activity, Error, Result};

impl Feed {
    /// Read activities from a flat feed, newest first.
    ///
    /// Results are in the order the service returns them; nothing is re-sorted.
    /// Fails with a precondition error on aggregated and notification feeds,
    /// use [`Feed::get_activity_groups`] for those.
    ///
    /// # Examples
    /// ```no_run
    /// use stream_feeds::FeedPage;
    ///
    /// # async fn example(feed: stream_feeds::Feed) -> stream_feeds::Result<()> {
    /// let first = feed.get_activities().limit(25).send().await?;
    /// if let Some(next) = first.next_page()? {
    ///     let second = feed.get_activities().options(next).send().await?;
    /// }
    /// # Ok(()) }
    /// ```
    pub fn get_activities(&self) -> ReadBuilder<'_, FlatFeedResponse> {
        ReadBuilder::new(self)
    }

    /// Read activity groups from an aggregated or notification feed.
    ///
    /// Fails with a precondition error on flat feeds.
    pub fn get_activity_groups(&self) -> ReadBuilder<'_, GroupedFeedResponse> {
        ReadBuilder::new(self)
    }
}

/// Marks notification groups as seen or read while reading them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    /// Every group returned.
    All,
    /// Only the groups with these ids.
    Groups(Vec<String>),
}

impl Mark {
    fn query_value(&self) -> String {
        match self {
            Mark::All => "true".to_string(),
            Mark::Groups(ids) => ids.join(","),
        }
    }

    fn parse(value: &str) -> Self {
        if value == "true" {
            Mark::All
        } else {
            Mark::Groups(value.split(',').map(str::to_string).collect())
        }
    }
}

/// Pagination, filtering and ranking parameters for feed reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Number of results to skip.
    pub offset: Option<u32>,
    /// Only results with an id greater than this.
    pub id_gt: Option<String>,
    /// Only results with an id greater than or equal to this.
    pub id_gte: Option<String>,
    /// Only results with an id lower than this.
    pub id_lt: Option<String>,
    /// Only results with an id lower than or equal to this.
    pub id_lte: Option<String>,
    /// Ranking method configured on the feed group.
    pub ranking: Option<String>,
    /// Notification feeds: groups to mark as seen.
    pub mark_seen: Option<Mark>,
    /// Notification feeds: groups to mark as read.
    pub mark_read: Option<Mark>,
}

impl ReadOptions {
    /// Parse the `next` link of a previous page into the options that fetch
    /// the page after it.
    ///
    /// The link is a path relative to the API host; any `api_key` in it is ignored.
    pub fn from_next(next: &str) -> Result<Self> {
        let url = Url::parse("http://localhost/")?.join(next)?;

        let mut options = ReadOptions::default();
        for (key, value) in url.query_pairs() {
            let value = value.into_owned();
            match key.as_ref() {
                "limit" => options.limit = Some(parse_number(&key, &value)?),
                "offset" => options.offset = Some(parse_number(&key, &value)?),
                "id_gt" => options.id_gt = Some(value),
                "id_gte" => options.id_gte = Some(value),
                "id_lt" => options.id_lt = Some(value),
                "id_lte" => options.id_lte = Some(value),
                "ranking" => options.ranking = Some(value),
                "mark_seen" => options.mark_seen = Some(Mark::parse(&value)),
                "mark_read" => options.mark_read = Some(Mark::parse(&value)),
                _ => {}
            }
        }
        Ok(options)
    }

    /// Query pairs in a fixed order.
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        for (key, value) in [
            ("id_gt", &self.id_gt),
            ("id_gte", &self.id_gte),
            ("id_lt", &self.id_lt),
            ("id_lte", &self.id_lte),
            ("ranking", &self.ranking),
        ] {
            if let Some(value) = value {
                pairs.push((key, value.clone()));
            }
        }
        if let Some(mark) = &self.mark_seen {
            pairs.push(("mark_seen", mark.query_value()));
        }
        if let Some(mark) = &self.mark_read {
            pairs.push(("mark_read", mark.query_value()));
        }
        pairs
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|err| Error::validation(format!("invalid {key} {value:?} in next link: {err}")))
}

/// A page of feed results.
pub trait FeedPage: DeserializeOwned {
    /// Whether this page type holds activity groups.
    const GROUPED: bool;

    /// The service's link to the following page, empty on the last page.
    fn next_link(&self) -> &str;

    /// Options fetching the page after this one, or `None` on the last page.
    fn next_page(&self) -> Result<Option<ReadOptions>> {
        match self.next_link() {
            "" => Ok(None),
            next => ReadOptions::from_next(next).map(Some),
        }
    }
}

/// Activities read from a flat feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlatFeedResponse {
    /// Activities, newest first.
    #[serde(default)]
    pub results: Vec<Activity>,
    /// Link to the next page; empty on the last one.
    #[serde(default)]
    pub next: String,
    /// Server-side processing time.
    #[serde(default)]
    pub duration: String,
}

impl FeedPage for FlatFeedResponse {
    const GROUPED: bool = false;

    fn next_link(&self) -> &str {
        &self.next
    }
}

/// A group of activities in an aggregated or notification feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActivityGroup {
    /// Group id.
    pub id: String,
    /// Aggregation key the activities share.
    #[serde(default)]
    pub group: String,
    /// Verb of the grouped activities.
    #[serde(default)]
    pub verb: String,
    /// Number of activities in the group, which may exceed `activities.len()`.
    #[serde(default)]
    pub activity_count: u32,
    /// Number of distinct actors.
    #[serde(default)]
    pub actor_count: u32,
    /// The most recent activities of the group.
    #[serde(default)]
    pub activities: Vec<Activity>,
    /// When the group was created.
    #[serde(default, deserialize_with = "time_format::deserialize")]
    pub created_at: Option<NaiveDateTime>,
    /// When the group last changed.
    #[serde(default, deserialize_with = "time_format::deserialize")]
    pub updated_at: Option<NaiveDateTime>,
    /// Notification feeds only.
    #[serde(default)]
    pub is_seen: Option<bool>,
    /// Notification feeds only.
    #[serde(default)]
    pub is_read: Option<bool>,
}

/// Activity groups read from an aggregated or notification feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupedFeedResponse {
    /// Groups, most recently updated first.
    #[serde(default)]
    pub results: Vec<ActivityGroup>,
    /// Link to the next page; empty on the last one.
    #[serde(default)]
    pub next: String,
    /// Server-side processing time.
    #[serde(default)]
    pub duration: String,
    /// Notification feeds only: number of unseen groups.
    #[serde(default)]
    pub unseen: Option<u32>,
    /// Notification feeds only: number of unread groups.
    #[serde(default)]
    pub unread: Option<u32>,
}

impl FeedPage for GroupedFeedResponse {
    const GROUPED: bool = true;

    fn next_link(&self) -> &str {
        &self.next
    }
}

/// Builder for feed reads.
///
/// Configure pagination and ranking, then call [`send`](Self::send).
/// See [`Feed::get_activities`] for examples.
#[derive(Debug)]
#[must_use]
pub struct ReadBuilder<'a, P> {
    feed: &'a Feed,
    options: ReadOptions,
    page: PhantomData<P>,
}

impl<'a, P: FeedPage> ReadBuilder<'a, P> {
    fn new(feed: &'a Feed) -> Self {
        Self {
            feed,
            options: ReadOptions::default(),
            page: PhantomData,
        }
    }

    /// Replace all options at once, e.g. with [`FeedPage::next_page`].
    pub fn options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    /// Maximum number of results (the service caps it).
    pub fn limit(mut self, limit: u32) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Skip this many results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.options.offset = Some(offset);
        self
    }

    /// Only results with an id greater than `id`.
    pub fn id_gt(mut self, id: &str) -> Self {
        self.options.id_gt = Some(id.to_string());
        self
    }

    /// Only results with an id greater than or equal to `id`.
    pub fn id_gte(mut self, id: &str) -> Self {
        self.options.id_gte = Some(id.to_string());
        self
    }

    /// Only results with an id lower than `id`.
    pub fn id_lt(mut self, id: &str) -> Self {
        self.options.id_lt = Some(id.to_string());
        self
    }

    /// Only results with an id lower than or equal to `id`.
    pub fn id_lte(mut self, id: &str) -> Self {
        self.options.id_lte = Some(id.to_string());
        self
    }

    /// Rank results with a ranking method configured on the feed group.
    pub fn ranking(mut self, ranking: &str) -> Self {
        self.options.ranking = Some(ranking.to_string());
        self
    }

    /// Notification feeds: mark groups as seen.
    pub fn mark_seen(mut self, mark: Mark) -> Self {
        self.options.mark_seen = Some(mark);
        self
    }

    /// Notification feeds: mark groups as read.
    pub fn mark_read(mut self, mark: Mark) -> Self {
        self.options.mark_read = Some(mark);
        self
    }

    /// Execute the read and decode the page.
    pub async fn send(self) -> Result<P> {
        let kind = self.feed.kind();
        if kind.is_grouped() != P::GROUPED {
            let expected = if P::GROUPED {
                "get_activity_groups"
            } else {
                "get_activities"
            };
            return Err(Error::precondition(format!(
                "{expected} cannot read {kind} feed {}",
                self.feed.id()
            )));
        }

        let mut req = self
            .feed
            .api_request(Method::GET, self.feed.path(), Scope::Read, Resource::Feed);
        for (key, value) in self.options.query_pairs() {
            req = req.query(key, value);
        }

        let response = self.feed.client.call(req).await?;
        decode(&response)
    }
}
