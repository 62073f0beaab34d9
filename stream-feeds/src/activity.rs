//! The activity record exchanged with the feed service.

use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::Feed;

/// Keys owned by the modelled fields; `extra` must not repeat them.
const RESERVED_KEYS: [&str; 7] = ["id", "actor", "verb", "object", "foreign_id", "time", "to"];

/// An `actor` / `verb` / `object` record, optionally keyed by a caller-chosen
/// `foreign_id` and `time`, fanned out to the feeds listed in `to`.
///
/// `id` is assigned by the service; it is empty on values built by the caller
/// and filled in on every activity the service returns. Any JSON field the
/// library does not model lands in `extra` and is sent back verbatim.
///
/// # Example
/// ```
/// use stream_feeds::{Activity, activity::current_time};
///
/// let activity = Activity::new("bob", "like", "ice-cream")
///     .with_foreign_id("like:bob:ice-cream")
///     .with_time(current_time())
///     .with_extra("popularity", 9000);
/// assert!(activity.id.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Service-assigned identifier; empty until persisted.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Who did it.
    pub actor: String,
    /// What they did.
    pub verb: String,
    /// What they did it to.
    pub object: String,
    /// Caller-supplied key. Together with `time` it identifies the activity for
    /// updates and target reconciliation.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub foreign_id: String,
    /// When it happened, in UTC. The service uses the current time when absent.
    #[serde(default, with = "time_format", skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveDateTime>,
    /// Canonical ids (`slug:user_id`) of the feeds this activity is copied to, in order.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,
    /// Arbitrary custom fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Activity {
    /// A new activity with only the required fields set.
    pub fn new(actor: impl Into<String>, verb: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            actor: actor.into(),
            verb: verb.into(),
            object: object.into(),
            foreign_id: String::new(),
            time: None,
            to: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Set the `foreign_id`.
    pub fn with_foreign_id(mut self, foreign_id: impl Into<String>) -> Self {
        self.foreign_id = foreign_id.into();
        self
    }

    /// Set the `time`, truncated to whole microseconds, which is the precision
    /// it is stored with.
    pub fn with_time(mut self, time: NaiveDateTime) -> Self {
        self.time = Some(time.trunc_subsecs(6));
        self
    }

    /// Set the `to` targets from feed handles, keeping their order.
    pub fn with_to(mut self, targets: &[&Feed]) -> Self {
        self.to = targets.iter().map(|feed| feed.id()).collect();
        self
    }

    /// Set one custom field.
    ///
    /// Names of the modelled fields (`actor`, `time`, ...) are not custom
    /// fields; an activity carrying one fails validation when submitted.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Whether `foreign_id` and `time` are both set, so the activity can be
    /// addressed without its service id.
    pub fn has_stable_identity(&self) -> bool {
        !self.foreign_id.is_empty() && self.time.is_some()
    }

    /// Reject activities the service would refuse: actor, verb and object must
    /// all be non-empty, and `extra` must not shadow a modelled field.
    pub(crate) fn validate(&self) -> crate::Result<()> {
        if let Some(key) = RESERVED_KEYS.iter().find(|key| self.extra.contains_key(**key)) {
            return Err(crate::Error::validation(format!(
                "custom field {key:?} collides with a built-in activity field"
            )));
        }
        for (field, value) in [
            ("actor", &self.actor),
            ("verb", &self.verb),
            ("object", &self.object),
        ] {
            if value.is_empty() {
                return Err(crate::Error::validation(format!(
                    "activity {field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// The current UTC time at the precision activities are stored with.
pub fn current_time() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `YYYY-MM-DDTHH:MM:SS.ffffff`, no offset, always six fractional digits.
pub(crate) mod time_format {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer, de};

    const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
    const READ_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub(crate) fn format(time: &NaiveDateTime) -> String {
        time.format(WRITE_FORMAT).to_string()
    }

    pub(crate) fn parse(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(s, READ_FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_utc()))
    }

    pub(crate) fn serialize<S>(time: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(time) => serializer.serialize_str(&format(time)),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .filter(|s| !s.is_empty())
            .map(|s| parse(&s).map_err(de::Error::custom))
            .transpose()
    }
}
