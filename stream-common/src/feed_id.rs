//! Canonical feed identity: a feed group `slug` plus the owning `user_id`.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Separator between slug and user id in the canonical form.
const SEPARATOR: char = ':';

/// Identifies one feed as `slug:user_id`.
///
/// Two values with the same slug and user id are interchangeable, whatever
/// kind of feed they were obtained from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedId {
    slug: String,
    user_id: String,
}

impl FeedId {
    /// Validate and build a [FeedId].
    ///
    /// Slugs are word characters (`[A-Za-z0-9_]`); user ids additionally allow `-`.
    pub fn new(slug: impl Into<String>, user_id: impl Into<String>) -> Result<Self, Error> {
        let slug = slug.into();
        let user_id = user_id.into();

        if slug.is_empty() {
            return Err(Error::EmptySlug);
        }
        if user_id.is_empty() {
            return Err(Error::EmptyUserId);
        }
        if !slug.chars().all(is_word_char) {
            return Err(Error::InvalidSlug(slug));
        }
        if !user_id.chars().all(|c| is_word_char(c) || c == '-') {
            return Err(Error::InvalidUserId(user_id));
        }

        Ok(Self { slug, user_id })
    }

    /// The feed group name, e.g. `flat`.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// The owner of this feed within its group.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The canonical `slug:user_id` string, as used in `to` targets and follows.
    pub fn canonical(&self) -> String {
        format!("{}{SEPARATOR}{}", self.slug, self.user_id)
    }

    /// The feed id embedded in feed-scoped tokens: `slug` and `user_id` joined
    /// without a separator.
    pub fn token_id(&self) -> String {
        format!("{}{}", self.slug, self.user_id)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Display for FeedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.slug, self.user_id)
    }
}

impl FromStr for FeedId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (slug, user_id) = s
            .split_once(SEPARATOR)
            .ok_or_else(|| Error::Malformed(s.to_string()))?;
        FeedId::new(slug, user_id)
    }
}

impl TryFrom<&str> for FeedId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Error> {
        value.parse()
    }
}

impl Serialize for FeedId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FeedId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
/// Error parsing or validating a [FeedId].
pub enum Error {
    #[error("Feed slug must not be empty")]
    /// Empty slug.
    EmptySlug,
    #[error("Feed user id must not be empty")]
    /// Empty user id.
    EmptyUserId,
    #[error("Invalid feed slug {0:?}: only letters, digits and `_` are allowed")]
    /// Slug with disallowed characters.
    InvalidSlug(String),
    #[error("Invalid feed user id {0:?}: only letters, digits, `_` and `-` are allowed")]
    /// User id with disallowed characters.
    InvalidUserId(String),
    #[error("Feed id {0:?} is not of the form `slug:user_id`")]
    /// Missing separator.
    Malformed(String),
}
